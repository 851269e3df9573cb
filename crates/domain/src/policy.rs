//! Long-term leave qualification rules.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use leavesync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::leave::{LeaveRecord, LeaveStatus};

/// How the duration and amount thresholds combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdCombinator {
    /// Either threshold alone qualifies a record.
    #[default]
    Any,
    /// Both thresholds must be met.
    All,
}

impl ThresholdCombinator {
    /// Parses `any`/`or` or `all`/`and`.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" | "or" => Ok(Self::Any),
            "all" | "and" => Ok(Self::All),
            other => Err(AppError::Validation(format!(
                "threshold mode must be 'any' or 'all', got '{other}'"
            ))),
        }
    }

    /// Returns the stable label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::All => "all",
        }
    }
}

/// Unit the thresholds are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeaveAggregation {
    /// Each record is judged on its own.
    #[default]
    PerRecord,
    /// A user's records in effect on the reference date are combined into one
    /// span: earliest start date, summed amount.
    PerUser,
}

impl LeaveAggregation {
    /// Parses `record` or `user`.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "record" | "per_record" => Ok(Self::PerRecord),
            "user" | "per_user" => Ok(Self::PerUser),
            other => Err(AppError::Validation(format!(
                "leave aggregation must be 'record' or 'user', got '{other}'"
            ))),
        }
    }
}

/// Input payload used to build a [`LongTermPolicy`].
#[derive(Debug, Clone)]
pub struct LongTermPolicyInput {
    /// Minimum whole days elapsed since the leave started.
    pub min_days: u32,
    /// Minimum declared leave amount in days.
    pub min_amount: f64,
    /// Date the policy is evaluated on, usually today.
    pub reference_date: NaiveDate,
    /// Threshold combination rule.
    pub combinator: ThresholdCombinator,
    /// Statuses that count as being on leave.
    pub on_leave_statuses: Vec<LeaveStatus>,
    /// Evaluation unit.
    pub aggregation: LeaveAggregation,
}

/// Policy deciding which leave records count as long-term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermPolicy {
    min_days: u32,
    min_amount: f64,
    reference_date: NaiveDate,
    combinator: ThresholdCombinator,
    on_leave_statuses: Vec<LeaveStatus>,
    aggregation: LeaveAggregation,
}

impl LongTermPolicy {
    /// Creates a validated policy.
    pub fn new(input: LongTermPolicyInput) -> AppResult<Self> {
        if !input.min_amount.is_finite() || input.min_amount < 0.0 {
            return Err(AppError::Validation(format!(
                "minimum leave amount must be a non-negative number, got {}",
                input.min_amount
            )));
        }

        if input.on_leave_statuses.is_empty() {
            return Err(AppError::Validation(
                "at least one on-leave status is required".to_owned(),
            ));
        }

        let mut on_leave_statuses = Vec::with_capacity(input.on_leave_statuses.len());
        for status in input.on_leave_statuses {
            if !on_leave_statuses.contains(&status) {
                on_leave_statuses.push(status);
            }
        }

        Ok(Self {
            min_days: input.min_days,
            min_amount: input.min_amount,
            reference_date: input.reference_date,
            combinator: input.combinator,
            on_leave_statuses,
            aggregation: input.aggregation,
        })
    }

    /// Returns the minimum elapsed days.
    #[must_use]
    pub fn min_days(&self) -> u32 {
        self.min_days
    }

    /// Returns the minimum declared amount.
    #[must_use]
    pub fn min_amount(&self) -> f64 {
        self.min_amount
    }

    /// Returns the evaluation date.
    #[must_use]
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Returns the threshold combination rule.
    #[must_use]
    pub fn combinator(&self) -> ThresholdCombinator {
        self.combinator
    }

    /// Returns the evaluation unit.
    #[must_use]
    pub fn aggregation(&self) -> LeaveAggregation {
        self.aggregation
    }

    /// Returns whether `status` counts as being on leave.
    #[must_use]
    pub fn counts_as_on_leave(&self, status: &LeaveStatus) -> bool {
        self.on_leave_statuses.contains(status)
    }

    /// Returns whether a single record is long-term on the reference date.
    #[must_use]
    pub fn qualifies(&self, record: &LeaveRecord) -> bool {
        if !self.is_active(record) {
            return false;
        }

        record
            .elapsed_days(self.reference_date)
            .is_some_and(|elapsed_days| self.meets_thresholds(elapsed_days, record.amount_days()))
    }

    /// Returns the distinct user identifiers on long-term leave.
    #[must_use]
    pub fn qualifying_users<'a, I>(&self, records: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a LeaveRecord>,
    {
        match self.aggregation {
            LeaveAggregation::PerRecord => records
                .into_iter()
                .filter(|record| self.qualifies(record))
                .map(|record| record.user_identifier().to_owned())
                .collect(),
            LeaveAggregation::PerUser => self.qualifying_users_per_user(records),
        }
    }

    fn qualifying_users_per_user<'a, I>(&self, records: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a LeaveRecord>,
    {
        let mut spans: BTreeMap<&str, (NaiveDate, Option<f64>)> = BTreeMap::new();

        for record in records {
            if !self.is_active(record) {
                continue;
            }
            let Some(start_date) = record.start_date() else {
                continue;
            };

            let span = spans
                .entry(record.user_identifier())
                .or_insert((start_date, None));
            span.0 = span.0.min(start_date);
            if let Some(amount) = record.amount_days() {
                span.1 = Some(span.1.unwrap_or(0.0) + amount);
            }
        }

        spans
            .into_iter()
            .filter(|(_, (start_date, amount))| {
                let elapsed_days = self
                    .reference_date
                    .signed_duration_since(*start_date)
                    .num_days();
                self.meets_thresholds(elapsed_days, *amount)
            })
            .map(|(user_identifier, _)| user_identifier.to_owned())
            .collect()
    }

    fn is_active(&self, record: &LeaveRecord) -> bool {
        self.counts_as_on_leave(record.status()) && record.is_in_effect_on(self.reference_date)
    }

    fn meets_thresholds(&self, elapsed_days: i64, amount_days: Option<f64>) -> bool {
        let by_duration = elapsed_days >= i64::from(self.min_days);
        let by_amount = amount_days.is_some_and(|amount| amount >= self.min_amount);

        match self.combinator {
            ThresholdCombinator::Any => by_duration || by_amount,
            ThresholdCombinator::All => by_duration && by_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::leave::LeaveRecordInput;

    fn date(value: &str) -> NaiveDate {
        value
            .parse::<NaiveDate>()
            .unwrap_or_else(|_| panic!("invalid test date {value}"))
    }

    fn policy_with(
        combinator: ThresholdCombinator,
        aggregation: LeaveAggregation,
    ) -> LongTermPolicy {
        LongTermPolicy::new(LongTermPolicyInput {
            min_days: 30,
            min_amount: 30.0,
            reference_date: date("2024-06-01"),
            combinator,
            on_leave_statuses: vec![LeaveStatus::Approved],
            aggregation,
        })
        .unwrap_or_else(|_| unreachable!())
    }

    fn default_policy() -> LongTermPolicy {
        policy_with(ThresholdCombinator::Any, LeaveAggregation::PerRecord)
    }

    fn leave(
        user: &str,
        status: LeaveStatus,
        start_date: Option<&str>,
        end_date: Option<&str>,
        amount_days: Option<f64>,
    ) -> LeaveRecord {
        LeaveRecord::new(LeaveRecordInput {
            user_identifier: user.to_owned(),
            status,
            start_date: start_date.map(date),
            end_date: end_date.map(date),
            amount_days,
        })
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn long_running_open_leave_qualifies_by_duration() {
        let record = leave("u1", LeaveStatus::Approved, Some("2024-05-01"), None, None);
        assert!(default_policy().qualifies(&record));
    }

    #[test]
    fn short_leave_with_large_amount_qualifies_by_amount() {
        let record = leave(
            "u2",
            LeaveStatus::Approved,
            Some("2024-05-20"),
            None,
            Some(35.0),
        );
        assert!(default_policy().qualifies(&record));
    }

    #[test]
    fn duration_one_day_short_with_exact_amount_qualifies() {
        let record = leave(
            "u3",
            LeaveStatus::Approved,
            Some("2024-05-03"),
            None,
            Some(30.0),
        );
        assert_eq!(record.elapsed_days(date("2024-06-01")), Some(29));
        assert!(default_policy().qualifies(&record));
    }

    #[test]
    fn exact_duration_with_small_amount_qualifies() {
        let record = leave(
            "u4",
            LeaveStatus::Approved,
            Some("2024-05-02"),
            None,
            Some(29.0),
        );
        assert!(default_policy().qualifies(&record));
    }

    #[test]
    fn below_both_thresholds_does_not_qualify() {
        let record = leave(
            "u5",
            LeaveStatus::Approved,
            Some("2024-05-03"),
            None,
            Some(29.5),
        );
        assert!(!default_policy().qualifies(&record));
    }

    #[test]
    fn all_combinator_requires_both_thresholds() {
        let policy = policy_with(ThresholdCombinator::All, LeaveAggregation::PerRecord);
        let by_duration_only = leave("u6", LeaveStatus::Approved, Some("2024-04-01"), None, None);
        let by_both = leave(
            "u7",
            LeaveStatus::Approved,
            Some("2024-04-01"),
            None,
            Some(45.0),
        );
        assert!(!policy.qualifies(&by_duration_only));
        assert!(policy.qualifies(&by_both));
    }

    #[test]
    fn ended_leave_does_not_qualify() {
        let record = leave(
            "u8",
            LeaveStatus::Approved,
            Some("2024-01-01"),
            Some("2024-05-31"),
            Some(120.0),
        );
        assert!(!default_policy().qualifies(&record));
    }

    #[test]
    fn missing_start_date_does_not_qualify() {
        let record = leave("u9", LeaveStatus::Approved, None, None, Some(90.0));
        assert!(!default_policy().qualifies(&record));
    }

    #[test]
    fn users_with_several_records_appear_once() {
        let records = vec![
            leave("u1", LeaveStatus::Approved, Some("2024-04-01"), None, None),
            leave(
                "u1",
                LeaveStatus::Approved,
                Some("2024-05-25"),
                Some("2024-07-01"),
                Some(40.0),
            ),
            leave("u2", LeaveStatus::Pending, Some("2024-04-01"), None, None),
        ];
        let users = default_policy().qualifying_users(&records);
        assert_eq!(users, BTreeSet::from(["u1".to_owned()]));
    }

    #[test]
    fn per_user_aggregation_sums_overlapping_amounts() {
        let records = vec![
            leave(
                "u1",
                LeaveStatus::Approved,
                Some("2024-05-25"),
                Some("2024-06-10"),
                Some(16.0),
            ),
            leave(
                "u1",
                LeaveStatus::Approved,
                Some("2024-05-28"),
                Some("2024-06-20"),
                Some(16.0),
            ),
        ];

        assert!(default_policy().qualifying_users(&records).is_empty());

        let per_user = policy_with(ThresholdCombinator::Any, LeaveAggregation::PerUser);
        assert_eq!(
            per_user.qualifying_users(&records),
            BTreeSet::from(["u1".to_owned()])
        );
    }

    #[test]
    fn negative_min_amount_is_rejected() {
        let result = LongTermPolicy::new(LongTermPolicyInput {
            min_days: 30,
            min_amount: -1.0,
            reference_date: date("2024-06-01"),
            combinator: ThresholdCombinator::Any,
            on_leave_statuses: vec![LeaveStatus::Approved],
            aggregation: LeaveAggregation::PerRecord,
        });
        assert!(result.is_err());
    }

    #[test]
    fn combinator_parses_aliases() {
        assert!(matches!(
            ThresholdCombinator::parse("OR"),
            Ok(ThresholdCombinator::Any)
        ));
        assert!(matches!(
            ThresholdCombinator::parse("and"),
            Ok(ThresholdCombinator::All)
        ));
        assert!(ThresholdCombinator::parse("xor").is_err());
    }

    fn any_status() -> impl Strategy<Value = LeaveStatus> {
        prop_oneof![
            Just(LeaveStatus::Approved),
            Just(LeaveStatus::Pending),
            Just(LeaveStatus::Rejected),
            Just(LeaveStatus::Cancelled),
        ]
    }

    proptest! {
        #[test]
        fn future_leave_never_qualifies(
            days_ahead in 1_i64..400,
            length in 0_i64..400,
            amount in proptest::option::of(0.0_f64..500.0),
        ) {
            let policy = default_policy();
            let start_date = policy.reference_date() + chrono::Duration::days(days_ahead);
            let record = LeaveRecord::new(LeaveRecordInput {
                user_identifier: "future@example.com".to_owned(),
                status: LeaveStatus::Approved,
                start_date: Some(start_date),
                end_date: Some(start_date + chrono::Duration::days(length)),
                amount_days: amount,
            })
            .unwrap_or_else(|_| unreachable!());
            prop_assert!(!policy.qualifies(&record));
        }

        #[test]
        fn inactive_statuses_never_qualify(
            status in prop_oneof![Just(LeaveStatus::Rejected), Just(LeaveStatus::Cancelled)],
            days_ago in 0_i64..1000,
            amount in proptest::option::of(0.0_f64..500.0),
        ) {
            let policy = default_policy();
            let record = LeaveRecord::new(LeaveRecordInput {
                user_identifier: "someone@example.com".to_owned(),
                status,
                start_date: Some(policy.reference_date() - chrono::Duration::days(days_ago)),
                end_date: None,
                amount_days: amount,
            })
            .unwrap_or_else(|_| unreachable!());
            prop_assert!(!policy.qualifies(&record));
        }

        #[test]
        fn qualifying_users_only_contain_qualifying_records(
            entries in proptest::collection::vec(
                (0_u8..5, any_status(), -60_i64..60, proptest::option::of(0.0_f64..60.0)),
                0..40,
            ),
        ) {
            let policy = default_policy();
            let records: Vec<LeaveRecord> = entries
                .into_iter()
                .map(|(user, status, offset, amount)| {
                    LeaveRecord::new(LeaveRecordInput {
                        user_identifier: format!("user-{user}"),
                        status,
                        start_date: Some(policy.reference_date() + chrono::Duration::days(offset)),
                        end_date: None,
                        amount_days: amount,
                    })
                    .unwrap_or_else(|_| unreachable!())
                })
                .collect();

            let users = policy.qualifying_users(&records);
            for user in &users {
                prop_assert!(records
                    .iter()
                    .any(|record| record.user_identifier() == user && policy.qualifies(record)));
            }
            for record in records.iter().filter(|record| policy.qualifies(record)) {
                prop_assert!(users.contains(record.user_identifier()));
            }
        }
    }
}

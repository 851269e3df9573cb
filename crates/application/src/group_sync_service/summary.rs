use chrono::NaiveDate;

use super::SyncPlan;
use crate::sync_settings::SyncSettings;

/// Kind of membership mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipOperation {
    /// Account added to the group.
    Add,
    /// Account removed from the group.
    Remove,
}

impl MembershipOperation {
    /// Returns the stable label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

/// One mutation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipFailure {
    /// Account the mutation targeted.
    pub account_id: String,
    /// Attempted mutation.
    pub operation: MembershipOperation,
    /// Error text returned by the directory.
    pub reason: String,
}

#[derive(Debug, Default)]
pub(super) struct ApplyOutcome {
    pub(super) added: usize,
    pub(super) removed: usize,
    pub(super) failures: Vec<MembershipFailure>,
}

/// Partial-success report for one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    /// Target group.
    pub group_id: String,
    /// Date the policy was evaluated on.
    pub reference_date: NaiveDate,
    /// Number of HR users on long-term leave.
    pub long_term_count: usize,
    /// HR users on long-term leave, sorted.
    pub long_term_users: Vec<String>,
    /// Accounts successfully added.
    pub added: usize,
    /// Accounts successfully removed.
    pub removed: usize,
    /// Long-term users skipped because no account matched.
    pub skipped_unresolved: usize,
    /// Mutations that failed.
    pub failed: usize,
    /// Skipped HR users, sorted.
    pub skipped_users: Vec<String>,
    /// Failed mutations ordered by account.
    pub failures: Vec<MembershipFailure>,
}

impl SyncSummary {
    pub(super) fn from_outcome(
        settings: &SyncSettings,
        plan: SyncPlan,
        outcome: ApplyOutcome,
    ) -> Self {
        let mut failures = outcome.failures;
        failures.sort_by(|left, right| {
            left.account_id
                .cmp(&right.account_id)
                .then_with(|| left.operation.as_str().cmp(right.operation.as_str()))
        });

        let mut skipped_users = plan.unresolved_users;
        skipped_users.sort();

        Self {
            group_id: settings.group_id.as_str().to_owned(),
            reference_date: settings.policy.reference_date(),
            long_term_count: plan.long_term_users.len(),
            long_term_users: plan.long_term_users.into_iter().collect(),
            added: outcome.added,
            removed: outcome.removed,
            skipped_unresolved: skipped_users.len(),
            failed: failures.len(),
            skipped_users,
            failures,
        }
    }

    /// Returns true when every planned mutation succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

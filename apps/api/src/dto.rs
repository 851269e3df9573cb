use chrono::NaiveDate;
use leavesync_application::{MembershipFailure, SyncSummary};
use serde::Serialize;

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// One membership change that could not be applied.
#[derive(Debug, Serialize)]
pub struct MembershipFailureResponse {
    pub account_id: String,
    pub operation: &'static str,
    pub reason: String,
}

impl From<MembershipFailure> for MembershipFailureResponse {
    fn from(value: MembershipFailure) -> Self {
        Self {
            account_id: value.account_id,
            operation: value.operation.as_str(),
            reason: value.reason,
        }
    }
}

/// Summary returned by every reconciliation trigger.
#[derive(Debug, Serialize)]
pub struct SyncSummaryResponse {
    /// `complete` when every change landed, `partial` otherwise.
    pub outcome: &'static str,
    pub group_id: String,
    pub reference_date: NaiveDate,
    pub long_term_count: usize,
    pub long_term_users: Vec<String>,
    pub added: usize,
    pub removed: usize,
    pub skipped_unresolved: usize,
    pub failed: usize,
    pub skipped_users: Vec<String>,
    pub failures: Vec<MembershipFailureResponse>,
}

impl From<SyncSummary> for SyncSummaryResponse {
    fn from(value: SyncSummary) -> Self {
        Self {
            outcome: if value.is_complete() {
                "complete"
            } else {
                "partial"
            },
            group_id: value.group_id,
            reference_date: value.reference_date,
            long_term_count: value.long_term_count,
            long_term_users: value.long_term_users,
            added: value.added,
            removed: value.removed,
            skipped_unresolved: value.skipped_unresolved,
            failed: value.failed,
            skipped_users: value.skipped_users,
            failures: value
                .failures
                .into_iter()
                .map(MembershipFailureResponse::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use leavesync_application::MembershipOperation;

    use super::*;

    fn summary(failures: Vec<MembershipFailure>) -> SyncSummary {
        SyncSummary {
            group_id: "00g-long-term".to_owned(),
            reference_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default(),
            long_term_count: 2,
            long_term_users: vec!["a@example.com".to_owned(), "d@example.com".to_owned()],
            added: 1,
            removed: 0,
            skipped_unresolved: 0,
            failed: failures.len(),
            skipped_users: Vec::new(),
            failures,
        }
    }

    #[test]
    fn partial_summary_serializes_failures() {
        let response = SyncSummaryResponse::from(summary(vec![MembershipFailure {
            account_id: "00u-a".to_owned(),
            operation: MembershipOperation::Remove,
            reason: "upstream error: Okta returned status 403".to_owned(),
        }]));
        let json = serde_json::to_value(&response).unwrap_or_default();

        assert_eq!(json["outcome"], "partial");
        assert_eq!(json["reference_date"], "2024-06-01");
        assert_eq!(json["failures"][0]["operation"], "remove");
        assert_eq!(json["long_term_count"], 2);
    }

    #[test]
    fn clean_summary_is_complete() {
        let response = SyncSummaryResponse::from(summary(Vec::new()));
        assert_eq!(response.outcome, "complete");
        assert!(response.failures.is_empty());
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use leavesync_core::AppError;
use leavesync_domain::{AccountId, GroupId, MembershipDelta};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::summary::{ApplyOutcome, MembershipFailure, MembershipOperation};
use crate::sync_ports::GroupDirectory;

/// Issues one mutation per account in the delta with at most `concurrency`
/// calls in flight. Failures never stop the remaining calls.
pub(super) async fn apply_delta(
    group_directory: Arc<dyn GroupDirectory>,
    group_id: &GroupId,
    delta: &MembershipDelta,
    concurrency: usize,
) -> ApplyOutcome {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending = HashMap::new();

    let operations = delta
        .to_add()
        .iter()
        .map(|account_id| (MembershipOperation::Add, account_id))
        .chain(
            delta
                .to_remove()
                .iter()
                .map(|account_id| (MembershipOperation::Remove, account_id)),
        );

    for (operation, account_id) in operations {
        let directory = group_directory.clone();
        let semaphore = semaphore.clone();
        let task_group_id = group_id.clone();
        let task_account_id = account_id.clone();

        let handle = tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|error| AppError::Internal(format!("apply limiter closed: {error}")))?;
            match operation {
                MembershipOperation::Add => {
                    directory
                        .add_member(&task_group_id, &task_account_id)
                        .await
                }
                MembershipOperation::Remove => {
                    directory
                        .remove_member(&task_group_id, &task_account_id)
                        .await
                }
            }
        });
        pending.insert(handle.id(), (operation, account_id.clone()));
    }

    let mut outcome = ApplyOutcome::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        let (task_id, result) = match joined {
            Ok((task_id, result)) => (task_id, result),
            Err(error) => (
                error.id(),
                Err(AppError::Internal(format!("membership task aborted: {error}"))),
            ),
        };
        let Some((operation, account_id)) = pending.remove(&task_id) else {
            continue;
        };

        record(&mut outcome, group_id, operation, account_id, result);
    }

    outcome
}

fn record(
    outcome: &mut ApplyOutcome,
    group_id: &GroupId,
    operation: MembershipOperation,
    account_id: AccountId,
    result: Result<(), AppError>,
) {
    match result {
        Ok(()) => {
            info!(
                group_id = %group_id,
                account_id = %account_id,
                operation = operation.as_str(),
                "group membership updated"
            );
            match operation {
                MembershipOperation::Add => outcome.added += 1,
                MembershipOperation::Remove => outcome.removed += 1,
            }
        }
        Err(error) => {
            warn!(
                group_id = %group_id,
                account_id = %account_id,
                operation = operation.as_str(),
                error = %error,
                "group membership update failed"
            );
            outcome.failures.push(MembershipFailure {
                account_id: account_id.as_str().to_owned(),
                operation,
                reason: error.to_string(),
            });
        }
    }
}

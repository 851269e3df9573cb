//! Reconciles the long-term leave group against the HR leave listing.

mod apply;
mod summary;


use std::collections::BTreeSet;
use std::sync::Arc;

use leavesync_core::AppResult;
use leavesync_domain::{AccountId, MembershipDelta};
use tracing::{info, warn};

use crate::leave_pager::LeaveRecordPager;
use crate::sync_ports::{GroupDirectory, IdentityResolver, LeaveRecordSource};
use crate::sync_settings::SyncSettings;

pub use summary::{MembershipFailure, MembershipOperation, SyncSummary};

/// Desired state and delta computed before any mutation is issued.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// HR user identifiers on long-term leave.
    pub long_term_users: BTreeSet<String>,
    /// Long-term users without an identity-provider account.
    pub unresolved_users: Vec<String>,
    /// Changes needed to converge the group.
    pub delta: MembershipDelta,
}

/// Application service running one reconciliation pass.
#[derive(Clone)]
pub struct GroupSyncService {
    leave_source: Arc<dyn LeaveRecordSource>,
    identity_resolver: Arc<dyn IdentityResolver>,
    group_directory: Arc<dyn GroupDirectory>,
}

impl GroupSyncService {
    /// Creates a new group sync service.
    #[must_use]
    pub fn new(
        leave_source: Arc<dyn LeaveRecordSource>,
        identity_resolver: Arc<dyn IdentityResolver>,
        group_directory: Arc<dyn GroupDirectory>,
    ) -> Self {
        Self {
            leave_source,
            identity_resolver,
            group_directory,
        }
    }

    /// Runs one full pass: plan, then apply every change.
    ///
    /// Read failures abort the pass. Individual mutation failures are
    /// collected into the returned summary.
    pub async fn run(&self, settings: &SyncSettings) -> AppResult<SyncSummary> {
        let plan = self.plan(settings).await?;

        info!(
            group_id = %settings.group_id,
            to_add = plan.delta.to_add().len(),
            to_remove = plan.delta.to_remove().len(),
            "applying group membership delta"
        );

        let outcome = apply::apply_delta(
            self.group_directory.clone(),
            &settings.group_id,
            &plan.delta,
            settings.apply_concurrency,
        )
        .await;

        let summary = SyncSummary::from_outcome(settings, plan, outcome);
        if summary.failed > 0 {
            warn!(
                group_id = %summary.group_id,
                added = summary.added,
                removed = summary.removed,
                failed = summary.failed,
                "group sync finished with failures"
            );
        } else {
            info!(
                group_id = %summary.group_id,
                added = summary.added,
                removed = summary.removed,
                skipped_unresolved = summary.skipped_unresolved,
                "group sync finished"
            );
        }

        Ok(summary)
    }

    /// Computes desired membership and the delta without mutating the group.
    pub async fn plan(&self, settings: &SyncSettings) -> AppResult<SyncPlan> {
        let mut pager = LeaveRecordPager::new(
            self.leave_source.as_ref(),
            settings.leave_query.clone(),
            settings.max_leave_pages,
        );
        let records = pager.collect_remaining().await?;

        let long_term_users = settings.policy.qualifying_users(&records);
        info!(
            record_count = records.len(),
            page_count = pager.pages_fetched(),
            long_term_count = long_term_users.len(),
            reference_date = %settings.policy.reference_date(),
            "evaluated leave records"
        );

        let mut desired: BTreeSet<AccountId> = BTreeSet::new();
        let mut unresolved_users = Vec::new();
        for user_identifier in &long_term_users {
            match self
                .identity_resolver
                .resolve_account(user_identifier)
                .await?
            {
                Some(account_id) => {
                    desired.insert(account_id);
                }
                None => {
                    warn!(
                        user = %user_identifier,
                        "no identity-provider account for long-term leave user, skipping"
                    );
                    unresolved_users.push(user_identifier.clone());
                }
            }
        }

        let current = self
            .group_directory
            .list_members(&settings.group_id)
            .await?;
        let delta = MembershipDelta::between(&desired, &current);

        Ok(SyncPlan {
            long_term_users,
            unresolved_users,
            delta,
        })
    }
}

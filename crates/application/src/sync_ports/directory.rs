use std::collections::BTreeSet;

use async_trait::async_trait;
use leavesync_core::AppResult;
use leavesync_domain::{AccountId, GroupId};

/// Port mapping HR-side user identifiers to identity-provider accounts.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Looks up the account for an HR user identifier.
    ///
    /// Returns `Ok(None)` when no account matches. Errors are reserved for
    /// lookups that could not be answered.
    async fn resolve_account(&self, user_identifier: &str) -> AppResult<Option<AccountId>>;
}

/// Port for reading and mutating identity-provider group membership.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Lists every account currently in the group.
    async fn list_members(&self, group_id: &GroupId) -> AppResult<BTreeSet<AccountId>>;

    /// Adds one account to the group.
    async fn add_member(&self, group_id: &GroupId, account_id: &AccountId) -> AppResult<()>;

    /// Removes one account from the group.
    async fn remove_member(&self, group_id: &GroupId, account_id: &AccountId) -> AppResult<()>;
}

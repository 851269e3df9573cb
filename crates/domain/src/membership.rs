//! Identity-provider group membership and the reconciliation delta.

use std::collections::BTreeSet;

use leavesync_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Identity-provider account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(NonEmptyString);

impl AccountId {
    /// Creates a validated account identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value).map(Self)
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identity-provider group identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(NonEmptyString);

impl GroupId {
    /// Creates a validated group identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value).map(Self)
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Accounts to add to and remove from a group so it matches the desired set.
///
/// The two sets are disjoint by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDelta {
    to_add: BTreeSet<AccountId>,
    to_remove: BTreeSet<AccountId>,
}

impl MembershipDelta {
    /// Computes the delta that turns `current` into `desired`.
    #[must_use]
    pub fn between(desired: &BTreeSet<AccountId>, current: &BTreeSet<AccountId>) -> Self {
        Self {
            to_add: desired.difference(current).cloned().collect(),
            to_remove: current.difference(desired).cloned().collect(),
        }
    }

    /// Returns the accounts missing from the group.
    #[must_use]
    pub fn to_add(&self) -> &BTreeSet<AccountId> {
        &self.to_add
    }

    /// Returns the accounts that should leave the group.
    #[must_use]
    pub fn to_remove(&self) -> &BTreeSet<AccountId> {
        &self.to_remove
    }

    /// Returns true when the group already matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Returns `current` with the whole delta applied.
    #[must_use]
    pub fn applied_to(&self, current: &BTreeSet<AccountId>) -> BTreeSet<AccountId> {
        current
            .difference(&self.to_remove)
            .chain(self.to_add.iter())
            .cloned()
            .collect()
    }
}

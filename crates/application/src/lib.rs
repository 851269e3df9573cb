//! Application services and ports.

#![forbid(unsafe_code)]

mod group_sync_service;
mod leave_pager;
mod sync_ports;
mod sync_settings;

pub use group_sync_service::{
    GroupSyncService, MembershipFailure, MembershipOperation, SyncPlan, SyncSummary,
};
pub use leave_pager::LeaveRecordPager;
pub use sync_ports::{
    GroupDirectory, IdentityResolver, LeavePage, LeavePageRequest, LeaveQuery, LeaveRecordSource,
    SecretSource,
};
pub use sync_settings::{SecretNames, SyncCredentials, SyncSettings, resolve_credentials};

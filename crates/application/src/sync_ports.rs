mod directory;
mod leave_source;
mod secrets;

pub use directory::{GroupDirectory, IdentityResolver};
pub use leave_source::{LeavePage, LeavePageRequest, LeaveQuery, LeaveRecordSource};
pub use secrets::SecretSource;

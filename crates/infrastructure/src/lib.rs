//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod deel_leave_record_source;
mod env_secret_source;
mod gcp_secret_manager_source;
mod okta_directory;

pub use deel_leave_record_source::DeelLeaveRecordSource;
pub use env_secret_source::EnvSecretSource;
pub use gcp_secret_manager_source::GcpSecretManagerSource;
pub use okta_directory::OktaDirectory;

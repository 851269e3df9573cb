use async_trait::async_trait;
use leavesync_core::AppResult;

/// Port for secret lookups by name.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Returns the secret value, or `None` when no such secret exists.
    async fn secret(&self, name: &str) -> AppResult<Option<String>>;

    /// Short backend label used in logs.
    fn source_name(&self) -> &'static str;
}

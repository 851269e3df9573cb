use async_trait::async_trait;
use leavesync_application::SecretSource;
use leavesync_core::AppResult;

/// Secret source reading secrets from environment variables.
///
/// The secret name is the variable name. Empty variables count as missing.
#[derive(Debug, Default)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    /// Creates a new environment secret source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn secret(&self, name: &str) -> AppResult<Option<String>> {
        Ok(std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty()))
    }

    fn source_name(&self) -> &'static str {
        "env"
    }
}

use std::sync::Arc;

use leavesync_application::SecretSource;

use crate::api_config::SecretProviderConfig;

/// Variable lookup used for per-invocation configuration.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub secret_provider: SecretProviderConfig,
    pub secret_source: Arc<dyn SecretSource>,
    pub env_lookup: EnvLookup,
}

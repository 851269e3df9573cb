//! Per-invocation configuration and credential resolution.

use leavesync_core::{AppError, AppResult};
use leavesync_domain::{GroupId, LongTermPolicy};
use tracing::debug;

use crate::sync_ports::{LeaveQuery, SecretSource};

/// Immutable settings for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Target identity-provider group.
    pub group_id: GroupId,
    /// Long-term qualification policy, including the reference date.
    pub policy: LongTermPolicy,
    /// Leave listing filter.
    pub leave_query: LeaveQuery,
    /// Maximum leave pages fetched before the run fails.
    pub max_leave_pages: u32,
    /// Maximum membership mutations in flight at once.
    pub apply_concurrency: usize,
}

/// Secret names used to look up upstream credentials.
#[derive(Debug, Clone, Default)]
pub struct SecretNames {
    /// Secret holding the HR platform API token.
    pub leave_api_token: Option<String>,
    /// Secret holding the identity-provider API token.
    pub directory_api_token: Option<String>,
    /// Secret holding the target group id.
    pub group_id: Option<String>,
}

/// Upstream credentials resolved at invocation start.
#[derive(Clone)]
pub struct SyncCredentials {
    /// HR platform bearer token.
    pub leave_api_token: String,
    /// Identity-provider API token.
    pub directory_api_token: String,
    /// Target group.
    pub group_id: GroupId,
}

impl std::fmt::Debug for SyncCredentials {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncCredentials")
            .field("leave_api_token", &"<redacted>")
            .field("directory_api_token", &"<redacted>")
            .field("group_id", &self.group_id)
            .finish()
    }
}

/// Resolves every credential or fails with a configuration error.
///
/// The group id secret wins over `fallback_group_id` when both are present.
pub async fn resolve_credentials(
    secret_source: &dyn SecretSource,
    names: &SecretNames,
    fallback_group_id: Option<&str>,
) -> AppResult<SyncCredentials> {
    let group_id = match lookup(secret_source, names.group_id.as_deref()).await? {
        Some(value) => Some(value),
        None => fallback_group_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned),
    }
    .ok_or_else(|| AppError::Configuration("OKTA_GROUP_ID not set".to_owned()))?;
    let group_id = GroupId::new(group_id)
        .map_err(|error| AppError::Configuration(format!("invalid OKTA_GROUP_ID: {error}")))?;

    let directory_api_token = lookup(secret_source, names.directory_api_token.as_deref())
        .await?
        .ok_or_else(|| AppError::Configuration("OKTA_API_TOKEN not set".to_owned()))?;

    let leave_api_token = lookup(secret_source, names.leave_api_token.as_deref())
        .await?
        .ok_or_else(|| AppError::Configuration("DEEL_API_TOKEN not set".to_owned()))?;

    Ok(SyncCredentials {
        leave_api_token,
        directory_api_token,
        group_id,
    })
}

async fn lookup(secret_source: &dyn SecretSource, name: Option<&str>) -> AppResult<Option<String>> {
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(None);
    };

    let value = secret_source.secret(name).await.map_err(|error| {
        AppError::Configuration(format!(
            "failed to read secret '{name}' from {}: {error}",
            secret_source.source_name()
        ))
    })?;
    debug!(
        secret_name = name,
        source = secret_source.source_name(),
        found = value.is_some(),
        "secret lookup"
    );

    Ok(value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty()))
}

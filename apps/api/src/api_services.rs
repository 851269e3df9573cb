use std::sync::Arc;

use chrono::Utc;
use leavesync_application::{GroupSyncService, SecretSource, SyncSummary, resolve_credentials};
use leavesync_core::AppResult;
use leavesync_infrastructure::{
    DeelLeaveRecordSource, EnvSecretSource, GcpSecretManagerSource, OktaDirectory,
};
use tracing::info;

use crate::api_config::{EnvReader, SecretProviderConfig};
use crate::state::AppState;
use crate::sync_config::SyncConfig;

pub fn build_secret_source(
    secret_provider: &SecretProviderConfig,
    http_client: reqwest::Client,
) -> Arc<dyn SecretSource> {
    match secret_provider {
        SecretProviderConfig::Env => Arc::new(EnvSecretSource::new()),
        SecretProviderConfig::GcpSecretManager { project_id } => Arc::new(
            GcpSecretManagerSource::new(http_client, project_id.clone()),
        ),
    }
}

/// Loads configuration and secrets, wires the adapters and runs one pass.
pub async fn run_sync_invocation(state: &AppState) -> AppResult<SyncSummary> {
    let config = {
        let reader = EnvReader::new(state.env_lookup.as_ref());
        SyncConfig::from_env(&reader, &state.secret_provider)?
    };
    let credentials = resolve_credentials(
        state.secret_source.as_ref(),
        &config.secret_names,
        config.okta_group_id.as_deref(),
    )
    .await?;

    let today = Utc::now().date_naive();
    let settings = config.settings(credentials.group_id, today)?;

    info!(
        secret_source = state.secret_source.source_name(),
        group_id = %settings.group_id,
        reference_date = %today,
        "starting long-term leave sync"
    );

    let leave_source = Arc::new(DeelLeaveRecordSource::new(
        state.http_client.clone(),
        config.deel_api_base_url.as_str(),
        credentials.leave_api_token,
    ));
    let okta = Arc::new(OktaDirectory::new(
        state.http_client.clone(),
        config.okta_org_url.as_str(),
        credentials.directory_api_token,
        config.okta_max_pages,
    )?);

    GroupSyncService::new(leave_source, okta.clone(), okta)
        .run(&settings)
        .await
}

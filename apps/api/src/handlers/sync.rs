use axum::Json;
use axum::extract::State;

use crate::api_services::run_sync_invocation;
use crate::dto::SyncSummaryResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Runs one reconciliation pass and returns its summary.
///
/// Partial mutation failures still answer 200; the summary reports them.
pub async fn run_sync_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<SyncSummaryResponse>> {
    let summary = run_sync_invocation(&state).await?;
    Ok(Json(SyncSummaryResponse::from(summary)))
}

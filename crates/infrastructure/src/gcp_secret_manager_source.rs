use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use leavesync_application::SecretSource;
use leavesync_core::{AppError, AppResult};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";
const DEFAULT_API_BASE_URL: &str = "https://secretmanager.googleapis.com/v1";

#[derive(Debug, Deserialize)]
struct MetadataAccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    data: String,
}

/// Google Secret Manager secret source authenticated through the metadata
/// server of the running workload.
///
/// Resolved values are cached for the lifetime of the source. Names starting
/// with `projects/` are treated as full secret resource names; other names
/// are looked up in the configured project, falling back to the project the
/// metadata server reports.
pub struct GcpSecretManagerSource {
    http_client: reqwest::Client,
    project_id: Option<String>,
    metadata_base_url: String,
    api_base_url: String,
    cache: Mutex<HashMap<String, String>>,
}

impl GcpSecretManagerSource {
    /// Creates a new Secret Manager source.
    #[must_use]
    pub fn new(http_client: reqwest::Client, project_id: Option<String>) -> Self {
        Self {
            http_client,
            project_id: project_id
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            metadata_base_url: DEFAULT_METADATA_BASE_URL.to_owned(),
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Points the source at other metadata and Secret Manager endpoints.
    #[must_use]
    pub fn with_endpoints(
        mut self,
        metadata_base_url: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        self.metadata_base_url = metadata_base_url.into().trim_end_matches('/').to_owned();
        self.api_base_url = api_base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn resource_name(&self, name: &str) -> AppResult<String> {
        if name.starts_with("projects/") {
            return Ok(format!("{name}/versions/latest"));
        }

        let project_id = match &self.project_id {
            Some(project_id) => project_id.clone(),
            None => self.metadata_project_id().await.map_err(|error| {
                AppError::Configuration(format!(
                    "GOOGLE_CLOUD_PROJECT not set and metadata lookup failed; \
                     cannot access Secret Manager: {error}"
                ))
            })?,
        };

        Ok(format!(
            "projects/{project_id}/secrets/{name}/versions/latest"
        ))
    }

    async fn metadata_get(&self, path: &str) -> AppResult<reqwest::Response> {
        let response = self
            .http_client
            .get(format!("{}/{path}", self.metadata_base_url))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|error| {
                AppError::Upstream(format!("failed to reach GCP metadata server: {error}"))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "GCP metadata server returned status {} for {path}",
                response.status().as_u16()
            )));
        }

        Ok(response)
    }

    async fn metadata_project_id(&self) -> AppResult<String> {
        let project_id = self
            .metadata_get("project/project-id")
            .await?
            .text()
            .await
            .map_err(|error| {
                AppError::Upstream(format!("failed to read GCP project id: {error}"))
            })?;
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(AppError::Upstream(
                "GCP metadata server returned an empty project id".to_owned(),
            ));
        }

        Ok(project_id.to_owned())
    }

    async fn access_token(&self) -> AppResult<String> {
        self.metadata_get("instance/service-accounts/default/token")
            .await?
            .json::<MetadataAccessToken>()
            .await
            .map(|token| token.access_token)
            .map_err(|error| {
                AppError::Upstream(format!("failed to parse GCP access token: {error}"))
            })
    }

    async fn access_secret_version(&self, resource_name: &str) -> AppResult<Option<String>> {
        let token = self.access_token().await?;
        let response = self
            .http_client
            .get(format!("{}/{resource_name}:access", self.api_base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| {
                AppError::Upstream(format!("failed to call Secret Manager: {error}"))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Upstream(format!(
                "Secret Manager returned status {}: {body}",
                status.as_u16()
            )));
        }

        let body = response
            .json::<AccessSecretVersionResponse>()
            .await
            .map_err(|error| {
                AppError::Upstream(format!("failed to parse Secret Manager response: {error}"))
            })?;

        decode_payload(body.payload.data.as_str()).map(Some)
    }
}

fn decode_payload(data: &str) -> AppResult<String> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|error| AppError::Validation(format!("secret payload is not base64: {error}")))?;

    String::from_utf8(bytes)
        .map_err(|error| AppError::Validation(format!("secret payload is not UTF-8: {error}")))
}

#[async_trait]
impl SecretSource for GcpSecretManagerSource {
    async fn secret(&self, name: &str) -> AppResult<Option<String>> {
        if let Some(value) = self.cache.lock().await.get(name) {
            return Ok(Some(value.clone()));
        }

        let resource_name = self.resource_name(name).await?;
        let value = self.access_secret_version(resource_name.as_str()).await?;
        debug!(secret = name, found = value.is_some(), "accessed Secret Manager secret");

        if let Some(value) = &value {
            self.cache
                .lock()
                .await
                .insert(name.to_owned(), value.clone());
        }

        Ok(value)
    }

    fn source_name(&self) -> &'static str {
        "gcp-secret-manager"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn source_for(server: &MockServer, project_id: Option<&str>) -> GcpSecretManagerSource {
        GcpSecretManagerSource::new(reqwest::Client::new(), project_id.map(str::to_owned))
            .with_endpoints(server.uri(), server.uri())
    }

    async fn mount_access_token(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/instance/service-accounts/default/token"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "ya29.test" })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn full_resource_names_are_used_verbatim() {
        let source = GcpSecretManagerSource::new(reqwest::Client::new(), None);
        let resource = source.resource_name("projects/p1/secrets/okta-token").await;
        assert_eq!(
            resource.unwrap_or_default(),
            "projects/p1/secrets/okta-token/versions/latest"
        );
    }

    #[tokio::test]
    async fn short_names_use_configured_project() {
        let source =
            GcpSecretManagerSource::new(reqwest::Client::new(), Some("people-ops".to_owned()));
        let resource = source.resource_name("deel-token").await;
        assert_eq!(
            resource.unwrap_or_default(),
            "projects/people-ops/secrets/deel-token/versions/latest"
        );
    }

    #[tokio::test]
    async fn cached_values_skip_the_network() {
        let source = GcpSecretManagerSource::new(reqwest::Client::new(), Some("p".to_owned()));
        source
            .cache
            .lock()
            .await
            .insert("okta-token".to_owned(), "cached".to_owned());

        let value = source.secret("okta-token").await;
        assert_eq!(value.unwrap_or_default().as_deref(), Some("cached"));
    }

    #[test]
    fn decodes_base64_payload() {
        assert_eq!(
            decode_payload("c2VjcmV0LXZhbHVl").unwrap_or_default(),
            "secret-value"
        );
        assert!(decode_payload("%%%").is_err());
    }

    #[tokio::test]
    async fn accesses_and_caches_latest_version() {
        let server = MockServer::start().await;
        mount_access_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/projects/people-ops/secrets/okta-token/versions/latest:access"))
            .and(header("Authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/people-ops/secrets/okta-token/versions/3",
                "payload": { "data": "c2VjcmV0LXZhbHVl" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = source_for(&server, Some("people-ops"));
        let first = source.secret("okta-token").await;
        let second = source.secret("okta-token").await;

        assert_eq!(first.unwrap_or_default().as_deref(), Some("secret-value"));
        assert_eq!(second.unwrap_or_default().as_deref(), Some("secret-value"));
    }

    #[tokio::test]
    async fn missing_secret_is_none() {
        let server = MockServer::start().await;
        mount_access_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/projects/people-ops/secrets/okta-group/versions/latest:access"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let value = source_for(&server, Some("people-ops"))
            .secret("okta-group")
            .await;
        assert!(matches!(value, Ok(None)));
    }

    #[tokio::test]
    async fn project_falls_back_to_metadata_server() {
        let server = MockServer::start().await;
        mount_access_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/project/project-id"))
            .respond_with(ResponseTemplate::new(200).set_body_string("meta-project\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/meta-project/secrets/deel-token/versions/latest:access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payload": { "data": "ZGVlbA==" }
            })))
            .mount(&server)
            .await;

        let value = source_for(&server, None).secret("deel-token").await;
        assert_eq!(value.unwrap_or_default().as_deref(), Some("deel"));
    }

    #[tokio::test]
    async fn permission_denied_is_upstream_error() {
        let server = MockServer::start().await;
        mount_access_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/projects/people-ops/secrets/okta-token/versions/latest:access"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let value = source_for(&server, Some("people-ops"))
            .secret("okta-token")
            .await;
        assert!(matches!(value, Err(AppError::Upstream(_))));
    }
}

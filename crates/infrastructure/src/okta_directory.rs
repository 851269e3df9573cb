mod link_header;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use leavesync_application::{GroupDirectory, IdentityResolver};
use leavesync_core::{AppError, AppResult};
use leavesync_domain::{AccountId, GroupId};
use reqwest::header;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use self::link_header::next_link;

const GROUP_MEMBERS_PAGE_LIMIT: u32 = 200;

/// Okta user payload fields used by the sync.
#[derive(Debug, Deserialize)]
struct OktaUser {
    id: String,
}

/// Okta management API implementation of identity resolution and group
/// membership.
pub struct OktaDirectory {
    http_client: reqwest::Client,
    api_base: Url,
    api_token: String,
    max_pages: u32,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl OktaDirectory {
    /// Creates a new Okta directory client for `org_url`.
    pub fn new(
        http_client: reqwest::Client,
        org_url: &str,
        api_token: impl Into<String>,
        max_pages: u32,
    ) -> AppResult<Self> {
        let org_url = org_url.trim().trim_end_matches('/');
        let api_base = Url::parse(format!("{org_url}/api/v1").as_str()).map_err(|error| {
            AppError::Configuration(format!("invalid OKTA_ORG_URL '{org_url}': {error}"))
        })?;
        if api_base.cannot_be_a_base() || api_base.host_str().is_none() {
            return Err(AppError::Configuration(format!(
                "OKTA_ORG_URL '{org_url}' must be an absolute http(s) URL"
            )));
        }

        Ok(Self {
            http_client,
            api_base,
            api_token: api_token.into(),
            max_pages: max_pages.max(1),
            max_attempts: 3,
            retry_backoff_ms: 500,
        })
    }

    /// Overrides the retry policy for membership mutations.
    #[must_use]
    pub fn with_retry(mut self, max_attempts: u8, retry_backoff_ms: u64) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Configuration(format!(
                    "OKTA_ORG_URL '{}' cannot be a base",
                    self.api_base
                ))
            })?
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(header::AUTHORIZATION, format!("SSWS {}", self.api_token))
            .header(header::ACCEPT, "application/json")
    }

    /// Only follows pagination links that stay on the configured org, so the
    /// API token is never sent elsewhere.
    fn same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.api_base.scheme()
            && url.host_str() == self.api_base.host_str()
            && url.port_or_known_default() == self.api_base.port_or_known_default()
    }

    async fn read_json<T>(response: reqwest::Response, context: &str) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Upstream(format!(
                "Okta {context} returned status {}: {body}",
                status.as_u16()
            )));
        }

        response.json::<T>().await.map_err(|error| {
            AppError::Upstream(format!("failed to parse Okta {context} response: {error}"))
        })
    }

    async fn mutate_with_retry(
        &self,
        method: reqwest::Method,
        url: Url,
        treat_not_found_as_done: bool,
    ) -> AppResult<()> {
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .authorized(self.http_client.request(method.clone(), url.clone()))
                .header(header::CONTENT_TYPE, "application/json")
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response)
                    if treat_not_found_as_done
                        && response.status() == reqwest::StatusCode::NOT_FOUND =>
                {
                    debug!(url = %url, "membership already absent");
                    return Ok(());
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} for Okta {method} {}",
                        response.status(),
                        url.path()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(AppError::Upstream(format!(
                        "Okta {method} {} failed with status {status}: {body}",
                        url.path()
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("Okta {method} transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Upstream(last_error.unwrap_or_else(|| {
            "Okta membership update exhausted retries".to_owned()
        })))
    }
}

/// Builds the Okta user search expression for an email.
fn email_search_expression(email: &str) -> String {
    let escaped = email.replace('\\', "\\\\").replace('"', "\\\"");
    format!("profile.email eq \"{escaped}\"")
}

#[async_trait]
impl IdentityResolver for OktaDirectory {
    async fn resolve_account(&self, user_identifier: &str) -> AppResult<Option<AccountId>> {
        let url = self.endpoint(&["users"])?;
        let response = self
            .authorized(self.http_client.get(url))
            .query(&[("search", email_search_expression(user_identifier))])
            .send()
            .await
            .map_err(|error| {
                AppError::Upstream(format!("failed to call Okta user search: {error}"))
            })?;

        let users = Self::read_json::<Vec<OktaUser>>(response, "user search").await?;
        match users.into_iter().next() {
            Some(user) => AccountId::new(user.id).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GroupDirectory for OktaDirectory {
    async fn list_members(&self, group_id: &GroupId) -> AppResult<BTreeSet<AccountId>> {
        let mut members = BTreeSet::new();
        let mut url = self.endpoint(&["groups", group_id.as_str(), "users"])?;
        url.query_pairs_mut()
            .append_pair("limit", GROUP_MEMBERS_PAGE_LIMIT.to_string().as_str());
        let mut pages = 0_u32;

        loop {
            if pages >= self.max_pages {
                return Err(AppError::Upstream(format!(
                    "Okta group '{group_id}' listing exceeded the page budget of {} pages",
                    self.max_pages
                )));
            }
            pages = pages.saturating_add(1);

            let response = self
                .authorized(self.http_client.get(url.clone()))
                .send()
                .await
                .map_err(|error| {
                    AppError::Upstream(format!("failed to call Okta group members: {error}"))
                })?;
            let next = next_link(response.headers());
            let users = Self::read_json::<Vec<OktaUser>>(response, "group members").await?;

            for user in users {
                members.insert(AccountId::new(user.id)?);
            }

            let Some(next) = next else {
                break;
            };
            let next_url = Url::parse(next.as_str()).map_err(|error| {
                AppError::Upstream(format!("invalid Okta pagination link '{next}': {error}"))
            })?;
            if !self.same_origin(&next_url) {
                warn!(link = %next_url, "refusing Okta pagination link to another origin");
                return Err(AppError::Upstream(format!(
                    "Okta pagination link '{next_url}' points outside the configured org"
                )));
            }
            url = next_url;
        }

        debug!(
            group_id = %group_id,
            member_count = members.len(),
            page_count = pages,
            "listed Okta group members"
        );

        Ok(members)
    }

    async fn add_member(&self, group_id: &GroupId, account_id: &AccountId) -> AppResult<()> {
        let url = self.endpoint(&["groups", group_id.as_str(), "users", account_id.as_str()])?;
        self.mutate_with_retry(reqwest::Method::PUT, url, false).await
    }

    async fn remove_member(&self, group_id: &GroupId, account_id: &AccountId) -> AppResult<()> {
        let url = self.endpoint(&["groups", group_id.as_str(), "users", account_id.as_str()])?;
        self.mutate_with_retry(reqwest::Method::DELETE, url, true).await
    }
}

mod mapping;

use async_trait::async_trait;
use leavesync_application::{LeavePage, LeavePageRequest, LeaveRecordSource};
use leavesync_core::{AppError, AppResult};
use serde_json::Value;
use tracing::{debug, info};

use self::mapping::parse_time_off_page;

/// Deel REST implementation of the leave record source.
pub struct DeelLeaveRecordSource {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl DeelLeaveRecordSource {
    /// Creates a new Deel leave record source.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_token: api_token.into(),
        }
    }

    fn query_parameters(request: &LeavePageRequest) -> Vec<(&'static str, String)> {
        match request.cursor.as_deref() {
            Some(cursor) => vec![("next", cursor.to_owned())],
            None => vec![
                ("status", "APPROVED".to_owned()),
                ("page_size", request.query.page_size.to_string()),
                (
                    "start_date",
                    format!("{}T00:00:00Z", request.query.start_date_floor),
                ),
            ],
        }
    }
}

#[async_trait]
impl LeaveRecordSource for DeelLeaveRecordSource {
    async fn fetch_page(&self, request: &LeavePageRequest) -> AppResult<LeavePage> {
        let endpoint = format!("{}/time_offs", self.base_url);
        let parameters = Self::query_parameters(request);

        if request.cursor.is_none() {
            info!(
                start_date = %request.query.start_date_floor,
                page_size = request.query.page_size,
                "requesting Deel time-off listing"
            );
        }

        let response = self
            .http_client
            .get(endpoint)
            .bearer_auth(self.api_token.as_str())
            .query(&parameters)
            .send()
            .await
            .map_err(|error| {
                AppError::Upstream(format!("failed to call Deel time_offs endpoint: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Upstream(format!(
                "Deel time_offs endpoint returned status {}: {body}",
                status.as_u16()
            )));
        }

        let body = response.json::<Value>().await.map_err(|error| {
            AppError::Upstream(format!(
                "failed to parse Deel time_offs response body: {error}"
            ))
        })?;

        let page = parse_time_off_page(&body);
        debug!(
            cursor = request.cursor.as_deref().unwrap_or("first"),
            record_count = page.records.len(),
            "parsed Deel time-off page"
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use leavesync_application::{
        LeavePageRequest, LeaveQuery, LeaveRecordPager, LeaveRecordSource,
    };
    use leavesync_core::AppError;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::DeelLeaveRecordSource;

    fn request(cursor: Option<&str>) -> LeavePageRequest {
        LeavePageRequest {
            query: LeaveQuery {
                page_size: 50,
                start_date_floor: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default(),
            },
            cursor: cursor.map(str::to_owned),
        }
    }

    #[test]
    fn first_page_sends_filters() {
        let parameters = DeelLeaveRecordSource::query_parameters(&request(None));
        assert_eq!(
            parameters,
            vec![
                ("status", "APPROVED".to_owned()),
                ("page_size", "50".to_owned()),
                ("start_date", "2024-06-01T00:00:00Z".to_owned()),
            ]
        );
    }

    #[test]
    fn follow_up_pages_send_only_cursor() {
        let parameters = DeelLeaveRecordSource::query_parameters(&request(Some("abc")));
        assert_eq!(parameters, vec![("next", "abc".to_owned())]);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let source = DeelLeaveRecordSource::new(
            reqwest::Client::new(),
            "https://api.letsdeel.com/rest/v2/",
            "token",
        );
        assert_eq!(source.base_url, "https://api.letsdeel.com/rest/v2");
    }

    fn source_for(server: &MockServer) -> DeelLeaveRecordSource {
        DeelLeaveRecordSource::new(reqwest::Client::new(), server.uri(), "deel-token")
    }

    #[tokio::test]
    async fn first_page_is_filtered_and_authorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_offs"))
            .and(header("Authorization", "Bearer deel-token"))
            .and(query_param("status", "APPROVED"))
            .and(query_param("page_size", "50"))
            .and(query_param("start_date", "2024-06-01T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "email": "ana@example.com", "start_date": "2024-06-03" }],
                "has_next_page": true,
                "next": "c2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = source_for(&server).fetch_page(&request(None)).await;
        assert!(page.is_ok());
        let page = page.unwrap_or_default();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn pager_walks_cursor_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_offs"))
            .and(query_param("next", "c2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "email": "ben@example.com", "start_date": "2024-06-10" }],
                "has_next_page": false
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/time_offs"))
            .and(query_param("status", "APPROVED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "email": "ana@example.com", "start_date": "2024-06-03" }],
                "has_next_page": true,
                "next": "c2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = source_for(&server);
        let mut pager = LeaveRecordPager::new(&source, request(None).query, 5);
        let records = pager.collect_remaining().await.unwrap_or_default();

        let users: Vec<&str> = records.iter().map(|record| record.user_identifier()).collect();
        assert_eq!(users, vec!["ana@example.com", "ben@example.com"]);
        assert_eq!(pager.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn error_status_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_offs"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .expect(1)
            .mount(&server)
            .await;

        let page = source_for(&server).fetch_page(&request(None)).await;
        assert!(matches!(
            page,
            Err(AppError::Upstream(message)) if message.contains("500")
        ));
    }
}

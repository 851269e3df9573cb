use chrono::{Days, NaiveDate};
use leavesync_application::{LeaveQuery, SecretNames, SyncSettings};
use leavesync_core::AppError;
use leavesync_domain::{
    GroupId, LeaveAggregation, LeaveStatus, LongTermPolicy, LongTermPolicyInput,
    ThresholdCombinator, parse_leave_date,
};

use crate::api_config::{EnvReader, SecretProviderConfig};

const DEFAULT_DEEL_API_BASE_URL: &str = "https://api.letsdeel.com/rest/v2";

/// Reconciliation configuration, read fresh for every invocation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub deel_api_base_url: String,
    pub deel_page_size: u32,
    pub deel_start_date: Option<NaiveDate>,
    pub deel_lookback_days: u32,
    pub deel_max_pages: u32,
    pub okta_org_url: String,
    pub okta_group_id: Option<String>,
    pub okta_max_pages: u32,
    pub secret_names: SecretNames,
    pub long_term_min_days: u32,
    pub long_term_min_amount: f64,
    pub long_term_threshold_mode: ThresholdCombinator,
    pub long_term_statuses: Vec<LeaveStatus>,
    pub long_term_aggregation: LeaveAggregation,
    pub apply_concurrency: usize,
}

impl SyncConfig {
    pub fn from_env(
        reader: &EnvReader<'_>,
        secret_provider: &SecretProviderConfig,
    ) -> Result<Self, AppError> {
        let okta_org_url = reader
            .required("OKTA_ORG_URL")?
            .trim_end_matches('/')
            .to_owned();
        let deel_api_base_url = reader
            .optional("DEEL_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_DEEL_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let deel_start_date = reader
            .optional("DEEL_START_DATE")
            .map(|value| {
                parse_leave_date(value.as_str()).ok_or_else(|| {
                    AppError::Configuration(format!("invalid DEEL_START_DATE value '{value}'"))
                })
            })
            .transpose()?;

        // With env secrets the token variables double as secret names.
        let secret_name = |name: &str, env_default: Option<&str>| {
            reader.optional(name).or_else(|| match secret_provider {
                SecretProviderConfig::Env => env_default.map(str::to_owned),
                SecretProviderConfig::GcpSecretManager { .. } => None,
            })
        };
        let secret_names = SecretNames {
            leave_api_token: secret_name("DEEL_API_TOKEN_SECRET", Some("DEEL_API_TOKEN")),
            directory_api_token: secret_name("OKTA_API_TOKEN_SECRET", Some("OKTA_API_TOKEN")),
            group_id: secret_name("OKTA_GROUP_ID_SECRET", None),
        };

        let long_term_threshold_mode = reader
            .optional("LONG_TERM_THRESHOLD_MODE")
            .map(|value| ThresholdCombinator::parse(value.as_str()))
            .transpose()
            .map_err(as_configuration)?
            .unwrap_or_default();
        let long_term_aggregation = reader
            .optional("LONG_TERM_AGGREGATION")
            .map(|value| LeaveAggregation::parse(value.as_str()))
            .transpose()
            .map_err(as_configuration)?
            .unwrap_or_default();
        let long_term_statuses = reader
            .optional("LONG_TERM_STATUSES")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|status| !status.is_empty())
                    .map(LeaveStatus::parse)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| vec![LeaveStatus::Approved]);

        let config = Self {
            deel_api_base_url,
            deel_page_size: reader.parse_or("DEEL_PAGE_SIZE", 100_u32)?,
            deel_start_date,
            deel_lookback_days: reader.parse_or("DEEL_LOOKBACK_DAYS", 365_u32)?,
            deel_max_pages: reader.parse_or("DEEL_MAX_PAGES", 500_u32)?,
            okta_org_url,
            okta_group_id: reader.optional("OKTA_GROUP_ID"),
            okta_max_pages: reader.parse_or("OKTA_MAX_PAGES", 500_u32)?,
            secret_names,
            long_term_min_days: reader.parse_or("LONG_TERM_MIN_DAYS", 30_u32)?,
            long_term_min_amount: reader.parse_or("LONG_TERM_MIN_AMOUNT", 30.0_f64)?,
            long_term_threshold_mode,
            long_term_statuses,
            long_term_aggregation,
            apply_concurrency: reader.parse_or("SYNC_APPLY_CONCURRENCY", 4_usize)?,
        };

        for (name, value) in [
            ("DEEL_PAGE_SIZE", config.deel_page_size),
            ("DEEL_MAX_PAGES", config.deel_max_pages),
            ("OKTA_MAX_PAGES", config.okta_max_pages),
        ] {
            if value == 0 {
                return Err(AppError::Configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        // Leave older than the look-back window is never listed, so the window
        // must reach past the duration threshold.
        if config.deel_start_date.is_none()
            && config.deel_lookback_days <= config.long_term_min_days
        {
            return Err(AppError::Configuration(format!(
                "DEEL_LOOKBACK_DAYS ({}) must be greater than LONG_TERM_MIN_DAYS ({})",
                config.deel_lookback_days, config.long_term_min_days
            )));
        }

        if config.apply_concurrency == 0 {
            return Err(AppError::Configuration(
                "SYNC_APPLY_CONCURRENCY must be greater than zero".to_owned(),
            ));
        }

        Ok(config)
    }

    /// Returns the earliest leave start date requested from Deel.
    ///
    /// `DEEL_START_DATE` wins; otherwise the floor is `today` minus the
    /// look-back window.
    pub fn start_date_floor(&self, today: NaiveDate) -> NaiveDate {
        self.deel_start_date.unwrap_or_else(|| {
            today
                .checked_sub_days(Days::new(u64::from(self.deel_lookback_days)))
                .unwrap_or(NaiveDate::MIN)
        })
    }

    /// Builds the immutable settings for one pass evaluated on `today`.
    pub fn settings(
        &self,
        group_id: GroupId,
        today: NaiveDate,
    ) -> Result<SyncSettings, AppError> {
        let policy = LongTermPolicy::new(LongTermPolicyInput {
            min_days: self.long_term_min_days,
            min_amount: self.long_term_min_amount,
            reference_date: today,
            combinator: self.long_term_threshold_mode,
            on_leave_statuses: self.long_term_statuses.clone(),
            aggregation: self.long_term_aggregation,
        })
        .map_err(as_configuration)?;

        Ok(SyncSettings {
            group_id,
            policy,
            leave_query: LeaveQuery {
                page_size: self.deel_page_size,
                start_date_floor: self.start_date_floor(today),
            },
            max_leave_pages: self.deel_max_pages,
            apply_concurrency: self.apply_concurrency,
        })
    }
}

fn as_configuration(error: AppError) -> AppError {
    match error {
        AppError::Validation(message) => AppError::Configuration(message),
        other => other,
    }
}

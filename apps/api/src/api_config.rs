use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use leavesync_core::AppError;
use tracing_subscriber::EnvFilter;

/// How the binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Serve the HTTP trigger until shut down.
    Serve,
    /// Run a single reconciliation pass and exit.
    RunOnce,
}

/// Backend used for secret lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretProviderConfig {
    /// Secrets are environment variables.
    Env,
    /// Secrets live in Google Secret Manager.
    GcpSecretManager { project_id: Option<String> },
}

/// Process-level configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub mode: RunMode,
    pub api_host: String,
    pub api_port: u16,
    pub http_timeout_seconds: u64,
    pub secret_provider: SecretProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let lookup = |name: &str| env::var(name).ok();
        Self::from_env(&EnvReader::new(&lookup), env::args().nth(1).as_deref())
    }

    pub fn from_env(
        reader: &EnvReader<'_>,
        first_argument: Option<&str>,
    ) -> Result<Self, AppError> {
        let mode = match first_argument {
            None | Some("serve") => RunMode::Serve,
            Some("run-once") => RunMode::RunOnce,
            Some(other) => {
                return Err(AppError::Configuration(format!(
                    "unknown command '{other}', expected 'serve' or 'run-once'"
                )));
            }
        };

        let api_host = reader
            .optional("API_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = reader.parse_or("API_PORT", 8080_u16)?;
        let http_timeout_seconds = reader.parse_or("HTTP_TIMEOUT_SECONDS", 30_u64)?;
        if http_timeout_seconds == 0 {
            return Err(AppError::Configuration(
                "HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let project_id = reader
            .optional("SECRET_PROJECT_ID")
            .or_else(|| reader.optional("GOOGLE_CLOUD_PROJECT"))
            .or_else(|| reader.optional("GCP_PROJECT"));
        let secret_provider = match reader.optional("SECRET_PROVIDER").as_deref() {
            Some("env") => SecretProviderConfig::Env,
            Some("gcp") => SecretProviderConfig::GcpSecretManager { project_id },
            Some(other) => {
                return Err(AppError::Configuration(format!(
                    "SECRET_PROVIDER must be either 'env' or 'gcp', got '{other}'"
                )));
            }
            None if project_id.is_some() => SecretProviderConfig::GcpSecretManager { project_id },
            None => SecretProviderConfig::Env,
        };

        Ok(Self {
            mode,
            api_host,
            api_port,
            http_timeout_seconds,
            secret_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Configuration(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Typed access to environment-style variables through a lookup function.
pub struct EnvReader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> EnvReader<'a> {
    pub fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    /// Returns the trimmed value, treating blank values as unset.
    pub fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    pub fn required(&self, name: &str) -> Result<String, AppError> {
        self.optional(name)
            .ok_or_else(|| AppError::Configuration(format!("{name} not set")))
    }

    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => value.parse::<T>().map_err(|error| {
                AppError::Configuration(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }
}

//! Logging setup and per-request log fields.

use crate::models::RequestIdentity;
use actix_web::{HttpMessage, HttpRequest};
use std::{env, str::FromStr};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Output format of the fmt subscriber
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("Unknown log format: {other}")),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub log_format: LogFormat,
    /// `EnvFilter` directive, e.g. `info,request_identity=debug`
    pub filter: String,
    pub service_name: String,
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: "info".to_string(),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            log_format: env::var("LOG_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
            filter: env::var("RUST_LOG").unwrap_or(defaults.filter),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            environment: env::var("SERVICE_ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }
}

/// Install the global tracing subscriber
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.filter)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        LogFormat::Pretty => builder.try_init()?,
        LogFormat::Json => builder.json().try_init()?,
        LogFormat::Compact => builder.compact().try_init()?,
    }

    info!(
        service_name = %config.service_name,
        environment = %config.environment,
        log_format = ?config.log_format,
        "Tracing initialized"
    );

    Ok(())
}

/// Fields attached to request log events
pub struct RequestLogFields {
    pub method: String,
    pub path: String,
    pub route_path: String,
    pub client_ip: String,
    pub user_agent: Option<String>,
}

impl RequestLogFields {
    /// Read the fields from a request. The route path and client address come
    /// from the resolved identity when one is present.
    pub fn from_request(req: &HttpRequest) -> Self {
        let extensions = req.extensions();
        let identity = extensions.get::<RequestIdentity>();

        Self {
            method: req.method().to_string(),
            path: req.path().to_string(),
            route_path: identity
                .map(|identity| identity.route_path().to_string())
                .unwrap_or_else(|| "unresolved".to_string()),
            client_ip: identity
                .map(|identity| identity.client_ip().to_string())
                .unwrap_or_else(|| "unresolved".to_string()),
            user_agent: crate::utils::extract_user_agent(req),
        }
    }
}

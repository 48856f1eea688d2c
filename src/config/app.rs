//! Site configuration consumed by URI and route path detection.

use crate::{models::ConfigError, services::route_path::DetectionMethod};
use std::env;
use url::Url;

/// Site URL configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Externally visible root of the site, including any subfolder
    pub base_url: String,
    /// Entry-script filename, empty when rewrites hide it
    pub index_page: String,
    /// Entry-script path reported by the hosting layer
    pub script_name: String,
    /// Hosts a request may use for the visible URI. Empty allows any host.
    pub allowed_hostnames: Vec<String>,
    pub force_global_secure_requests: bool,
    /// Detection method used when the site URI is built from the environment
    pub uri_protocol: DetectionMethod,
    /// Honor `?/path` forwarding in the request-string detection method
    pub forwarded_query_path: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            index_page: String::new(),
            script_name: "/".to_string(),
            allowed_hostnames: Vec::new(),
            force_global_secure_requests: false,
            uri_protocol: DetectionMethod::Auto,
            forwarded_query_path: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = env::var("APP_BASE_URL").unwrap_or(defaults.base_url);

        let index_page = env::var("APP_INDEX_PAGE")
            .map(|v| v.trim().to_string())
            .unwrap_or(defaults.index_page);

        let script_name = env::var("APP_SCRIPT_NAME")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| format!("/{index_page}"));

        let allowed_hostnames = env::var("APP_ALLOWED_HOSTNAMES")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|host| host.trim().to_ascii_lowercase())
                    .filter(|host| !host.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let force_global_secure_requests = env::var("APP_FORCE_SECURE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let uri_protocol = env::var("APP_URI_PROTOCOL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.uri_protocol);

        let forwarded_query_path = env::var("APP_FORWARDED_QUERY_PATH")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            base_url,
            index_page,
            script_name,
            allowed_hostnames,
            force_global_secure_requests,
            uri_protocol,
            forwarded_query_path,
        }
    }

    /// Fail fast on a configuration that cannot produce a site URI
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalized_base_url().map(|_| ())
    }

    /// Base URL with exactly one trailing slash, validated as an absolute URL
    pub fn normalized_base_url(&self) -> Result<String, ConfigError> {
        let base_url = format!("{}/", self.base_url.trim_end_matches(['/', ' ']));

        match Url::parse(&base_url) {
            Ok(url) if url.has_host() && !url.cannot_be_a_base() => Ok(base_url),
            _ => Err(ConfigError::InvalidBaseUrl(self.base_url.clone())),
        }
    }

    /// Hostname of the base URL
    pub fn base_host(&self) -> Option<String> {
        let base_url = self.normalized_base_url().ok()?;
        Url::parse(&base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
    }

    /// Whether a request host may be used for the visible URI
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();

        self.allowed_hostnames.is_empty()
            || self.allowed_hostnames.iter().any(|allowed| *allowed == host)
            || self.base_host().as_deref() == Some(host.as_str())
    }
}

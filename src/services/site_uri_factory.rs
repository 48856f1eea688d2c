//! Builds the request's `SiteUri` from a captured environment snapshot.

use crate::{
    config::AppConfig,
    models::{EnvironmentSnapshot, IdentityError, RawEnvironmentSignals, SiteUri, Uri, UriError},
    services::route_path::{DetectionMethod, RouteDetection, RoutePathDetector},
};
use std::sync::OnceLock;

/// Creates `SiteUri` values for one request.
///
/// The environment is captured once at construction. Each detection method
/// is run at most once per factory; later calls return the first result even
/// if the snapshot has been replaced in the meantime.
#[derive(Debug)]
pub struct SiteUriFactory {
    config: AppConfig,
    signals: RawEnvironmentSignals,
    host: Option<String>,
    detector: RoutePathDetector,
    detections: [OnceLock<RouteDetection>; 4],
}

impl SiteUriFactory {
    pub fn new(config: AppConfig, environment: &impl EnvironmentSnapshot) -> Self {
        Self::from_signals(config, environment.capture(), environment.host())
    }

    pub fn from_signals(config: AppConfig, signals: RawEnvironmentSignals, host: Option<String>) -> Self {
        let detector = RoutePathDetector::new().with_forwarded_query_path(config.forwarded_query_path);

        Self {
            config,
            signals,
            host,
            detector,
            detections: Default::default(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn signals(&self) -> &RawEnvironmentSignals {
        &self.signals
    }

    /// Take a fresh snapshot. Route paths already detected are kept.
    pub fn recapture(&mut self, environment: &impl EnvironmentSnapshot) {
        self.signals = environment.capture();
        self.host = environment.host();
    }

    /// Route path for `method`, detected on first use and cached afterwards
    pub fn detect_route_path(&self, method: DetectionMethod) -> &str {
        &self.detection(method).route_path
    }

    /// Query string the request exposes once `method` has run
    pub fn query_string(&self, method: DetectionMethod) -> &str {
        self.detection(method)
            .query
            .as_deref()
            .or(self.signals.query_string.as_deref())
            .unwrap_or_default()
    }

    /// Build the `SiteUri` for the current request using the configured method
    pub fn create_from_environment(&self) -> Result<SiteUri, IdentityError> {
        self.config.validate()?;

        let method = self.config.uri_protocol;
        let route_path = self.detect_route_path(method);
        let query = self.query_string(method);

        let relative_path = if query.is_empty() {
            route_path.to_string()
        } else {
            format!("{route_path}?{query}")
        };

        SiteUri::new(&self.config, &relative_path, self.host.as_deref(), None)
    }

    /// Build a `SiteUri` from an absolute URL.
    ///
    /// The base URL path and index page are removed from the URL path when
    /// present. The URL host is used only if the configuration allows it.
    pub fn create_from_string(&self, uri: &str) -> Result<SiteUri, IdentityError> {
        self.config.validate()?;

        let parsed = Uri::parse(uri)?;
        if parsed.scheme().is_empty() || parsed.host().is_empty() {
            return Err(UriError::UnableToParse(uri.to_string()).into());
        }

        let base = Uri::parse(&self.config.normalized_base_url()?)?;
        let path = parsed.path();
        let route_path = path
            .strip_prefix(base.path().as_str())
            .map(|rest| format!("/{rest}"))
            .unwrap_or(path);
        let route_path = strip_leading_segment(&route_path, &self.config.index_page);

        let mut relative_path = route_path.to_string();
        let query = parsed.query();
        if !query.is_empty() {
            relative_path.push('?');
            relative_path.push_str(&query);
        }
        if !parsed.fragment().is_empty() {
            relative_path.push('#');
            relative_path.push_str(parsed.fragment());
        }

        SiteUri::new(
            &self.config,
            &relative_path,
            Some(parsed.host()),
            Some(parsed.scheme()),
        )
    }

    fn detection(&self, method: DetectionMethod) -> &RouteDetection {
        let cell = &self.detections[method.index()];

        if let Some(detection) = cell.get() {
            tracing::debug!(
                method = %method,
                route_path = %detection.route_path,
                cached = true,
                "Route path detected"
            );
            return detection;
        }

        cell.get_or_init(|| {
            let detection = self
                .detector
                .detect(&self.signals, &self.config.index_page, method);
            tracing::debug!(
                method = %method,
                route_path = %detection.route_path,
                cached = false,
                "Route path detected"
            );
            detection
        })
    }
}

fn strip_leading_segment<'a>(path: &'a str, segment: &str) -> &'a str {
    if segment.is_empty() {
        return path;
    }

    match path.trim_start_matches('/').strip_prefix(segment) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::environment::{HTTP_HOST, QUERY_STRING, REQUEST_URI, SCRIPT_NAME};
    use std::collections::HashMap;

    fn server(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config(base_url: &str) -> AppConfig {
        AppConfig {
            base_url: base_url.to_string(),
            index_page: "index.php".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_create_from_environment() {
        let vars = server(&[
            (REQUEST_URI, "/index.php/woot?code=good#pos"),
            (SCRIPT_NAME, "/index.php"),
            (HTTP_HOST, "example.com:8080"),
        ]);
        let factory = SiteUriFactory::new(config("http://example.com/"), &vars);

        let uri = factory.create_from_environment().unwrap();
        assert_eq!(uri.route_path(), "woot");
        assert_eq!(uri.to_string(), "http://example.com/index.php/woot?code=good");
    }

    #[test]
    fn test_query_string_forwarding_rewrites_query() {
        let vars = server(&[
            (REQUEST_URI, "/index.php?/ci/woot?code=good"),
            (QUERY_STRING, "/ci/woot?code=good"),
            (SCRIPT_NAME, "/index.php"),
        ]);
        let mut app_config = config("http://example.com/");
        app_config.uri_protocol = DetectionMethod::QueryString;
        let factory = SiteUriFactory::new(app_config, &vars);

        assert_eq!(factory.detect_route_path(DetectionMethod::QueryString), "ci/woot");
        assert_eq!(factory.query_string(DetectionMethod::QueryString), "code=good");

        let uri = factory.create_from_environment().unwrap();
        assert_eq!(uri.uri().query_value("code"), Some("good"));
        assert_eq!(uri.to_string(), "http://example.com/index.php/ci/woot?code=good");
    }

    #[test]
    fn test_detected_path_is_never_rediscovered() {
        let mut vars = server(&[(REQUEST_URI, "/fruits/banana"), (SCRIPT_NAME, "/index.php")]);
        let mut factory = SiteUriFactory::new(config("http://example.com/"), &vars);

        assert_eq!(factory.detect_route_path(DetectionMethod::RequestUri), "fruits/banana");

        vars.insert(REQUEST_URI.to_string(), "/candy/snickers".to_string());
        factory.recapture(&vars);

        assert_eq!(factory.detect_route_path(DetectionMethod::RequestUri), "fruits/banana");
        assert_eq!(factory.detect_route_path(DetectionMethod::RequestUri), "fruits/banana");
        assert_eq!(
            factory.signals().request_uri.as_deref(),
            Some("/candy/snickers")
        );
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let factory = SiteUriFactory::from_signals(config("invalid"), RawEnvironmentSignals::new(), None);
        let err = factory.create_from_environment().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_create_from_string() {
        let mut app_config = config("http://localhost:8080/");
        app_config.allowed_hostnames = vec!["users.example.jp".to_string()];
        let factory = SiteUriFactory::from_signals(app_config, RawEnvironmentSignals::new(), None);

        let uri = factory
            .create_from_string("http://invalid.example.jp/foo/bar?page=3")
            .unwrap();
        assert_eq!(uri.to_string(), "http://localhost:8080/index.php/foo/bar?page=3");
        assert_eq!(uri.route_path(), "foo/bar");

        let uri = factory
            .create_from_string("https://users.example.jp/index.php/profile")
            .unwrap();
        assert_eq!(uri.to_string(), "https://users.example.jp:8080/index.php/profile");
        assert_eq!(uri.route_path(), "profile");

        assert!(factory.create_from_string("/no/scheme").is_err());
    }
}

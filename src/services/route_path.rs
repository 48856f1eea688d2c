//! Route path detection.
//!
//! Derives the path the router dispatches on from a frozen snapshot of the
//! raw request signals. Detection is a pure function of its inputs: it never
//! reads the live environment and never mutates the snapshot. When a method
//! rewrites the query component (the `?/path` forwarding convention), the new
//! query is returned alongside the route path instead of being written back.

use crate::models::{RawEnvironmentSignals, remove_dot_segments};
use std::{fmt, str::FromStr};

/// Root sentinel returned whenever no route remains
pub const ROOT_ROUTE: &str = "/";

/// Which raw signal the route path is derived from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DetectionMethod {
    /// First present of request URI, query string, path info
    #[default]
    Auto,
    RequestUri,
    QueryString,
    PathInfo,
}

impl DetectionMethod {
    pub const ALL: [DetectionMethod; 4] = [
        DetectionMethod::Auto,
        DetectionMethod::RequestUri,
        DetectionMethod::QueryString,
        DetectionMethod::PathInfo,
    ];

    /// Configuration name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Auto => "AUTO",
            DetectionMethod::RequestUri => "REQUEST_URI",
            DetectionMethod::QueryString => "QUERY_STRING",
            DetectionMethod::PathInfo => "PATH_INFO",
        }
    }

    /// Lowercase label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            DetectionMethod::Auto => "auto",
            DetectionMethod::RequestUri => "request_uri",
            DetectionMethod::QueryString => "query_string",
            DetectionMethod::PathInfo => "path_info",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            DetectionMethod::Auto => 0,
            DetectionMethod::RequestUri => 1,
            DetectionMethod::QueryString => 2,
            DetectionMethod::PathInfo => 3,
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "AUTO" => Ok(DetectionMethod::Auto),
            "REQUEST_URI" => Ok(DetectionMethod::RequestUri),
            "QUERY_STRING" => Ok(DetectionMethod::QueryString),
            "PATH_INFO" => Ok(DetectionMethod::PathInfo),
            other => Err(format!("Unknown route detection method: {other}")),
        }
    }
}

/// Outcome of one detection pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDetection {
    /// Route path without leading slash, or `/` for the root
    pub route_path: String,
    /// Query string the request should expose after detection.
    /// `None` leaves the captured query string as it was.
    pub query: Option<String>,
}

impl RouteDetection {
    fn root() -> Self {
        Self {
            route_path: ROOT_ROUTE.to_string(),
            query: None,
        }
    }

    fn new(raw_path: &str, query: Option<String>) -> Self {
        Self {
            route_path: normalize_route_path(raw_path),
            query,
        }
    }
}

/// Derives route paths from raw request signals
#[derive(Clone, Debug)]
pub struct RoutePathDetector {
    forwarded_query_path: bool,
}

impl Default for RoutePathDetector {
    fn default() -> Self {
        Self {
            forwarded_query_path: true,
        }
    }
}

impl RoutePathDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the request URI method decodes a `?/path` query as the route
    pub fn with_forwarded_query_path(mut self, enabled: bool) -> Self {
        self.forwarded_query_path = enabled;
        self
    }

    pub fn forwarded_query_path(&self) -> bool {
        self.forwarded_query_path
    }

    /// Run one detection pass
    pub fn detect(
        &self,
        signals: &RawEnvironmentSignals,
        index_page: &str,
        method: DetectionMethod,
    ) -> RouteDetection {
        match method {
            DetectionMethod::RequestUri => self.parse_request_uri(signals, index_page),
            DetectionMethod::QueryString => parse_query_string(signals.query_string.as_deref()),
            DetectionMethod::PathInfo => match signals.path_info.as_deref() {
                Some(path_info) => RouteDetection::new(path_info, None),
                None => self.parse_request_uri(signals, index_page),
            },
            DetectionMethod::Auto => {
                let method = if signals.request_uri.is_some() {
                    DetectionMethod::RequestUri
                } else if signals.query_string.is_some() {
                    DetectionMethod::QueryString
                } else {
                    DetectionMethod::PathInfo
                };
                self.detect(signals, index_page, method)
            }
        }
    }

    fn parse_request_uri(&self, signals: &RawEnvironmentSignals, index_page: &str) -> RouteDetection {
        let Some(request_uri) = signals.request_uri.as_deref() else {
            return RouteDetection::root();
        };

        let request_uri = request_uri.split('#').next().unwrap_or_default();
        let (path, query) = match request_uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (request_uri, ""),
        };

        let script_name = signals.script_name.as_deref().unwrap_or_default();
        let (path, script_consumed) = strip_script_path(path, script_name);
        let path = if script_consumed {
            path.as_str()
        } else {
            strip_index_page(&path, index_page)
        };

        if self.forwarded_query_path && path.trim_matches('/').is_empty() && query.starts_with('/') {
            return parse_query_string(Some(query));
        }

        RouteDetection::new(&remove_dot_segments(path), Some(query.to_string()))
    }
}

/// Detect with the default detector settings
pub fn detect_route_path(
    signals: &RawEnvironmentSignals,
    index_page: &str,
    method: DetectionMethod,
) -> String {
    RoutePathDetector::default()
        .detect(signals, index_page, method)
        .route_path
}

fn parse_query_string(query_string: Option<&str>) -> RouteDetection {
    let query_string = query_string.unwrap_or_default();

    if query_string.trim_matches('/').is_empty() {
        return RouteDetection::root();
    }

    let (path, query) = match query_string.find(['?', '&']) {
        Some(boundary) => (&query_string[..boundary], &query_string[boundary + 1..]),
        None => (query_string, ""),
    };

    RouteDetection::new(&remove_dot_segments(path), Some(query.to_string()))
}

/// Drop the leading run of path segments shared with the entry-script path.
///
/// Skipped when the script path names no file (e.g. `/` under a rewrite that
/// hides the entry script). The flag is set when the whole script path,
/// file segment included, was removed.
fn strip_script_path(path: &str, script_name: &str) -> (String, bool) {
    if path.is_empty() || script_name.rsplit('/').next().unwrap_or_default().is_empty() {
        return (path.to_string(), false);
    }

    let shared = path
        .split('/')
        .zip(script_name.split('/'))
        .take_while(|(segment, script_segment)| segment == script_segment)
        .count();
    let consumed = shared == script_name.split('/').count();

    (path.split('/').skip(shared).collect::<Vec<_>>().join("/"), consumed)
}

/// Drop the index page when it is the first remaining segment.
///
/// Only applies when the entry script was not already matched in the path.
fn strip_index_page<'a>(path: &'a str, index_page: &str) -> &'a str {
    if index_page.is_empty() {
        return path;
    }

    let trimmed = path.trim_start_matches('/');
    match trimmed.strip_prefix(index_page) {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

fn normalize_route_path(path: &str) -> String {
    let route = path.trim_start_matches('/');
    if route.is_empty() {
        ROOT_ROUTE.to_string()
    } else {
        route.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(request_uri: &str, script_name: &str) -> RawEnvironmentSignals {
        RawEnvironmentSignals::new()
            .with_request_uri(request_uri)
            .with_script_name(script_name)
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("REQUEST_URI".parse::<DetectionMethod>(), Ok(DetectionMethod::RequestUri));
        assert_eq!("path_info".parse::<DetectionMethod>(), Ok(DetectionMethod::PathInfo));
        assert_eq!("".parse::<DetectionMethod>(), Ok(DetectionMethod::Auto));
        assert!("ORIG_PATH_INFO".parse::<DetectionMethod>().is_err());
        assert_eq!(DetectionMethod::QueryString.to_string(), "QUERY_STRING");
    }

    #[test]
    fn test_strips_script_and_index_page() {
        let signals = request("/index.php/woot", "/index.php");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "woot"
        );
    }

    #[test]
    fn test_root_request() {
        let signals = request("/", "/index.php");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::Auto),
            "/"
        );
        assert_eq!(
            detect_route_path(&RawEnvironmentSignals::new(), "index.php", DetectionMethod::Auto),
            "/"
        );
    }

    #[test]
    fn test_only_first_index_page_is_stripped() {
        let signals = request("/app/index.php/user/index.php/profile", "/app/public/index.php");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "user/index.php/profile"
        );
    }

    #[test]
    fn test_routed_index_page_after_script_survives() {
        let signals = request("/index.php/index.php/foo", "/index.php");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "index.php/foo"
        );

        let signals = request("/ci/index.php/index.php", "/ci/index.php");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "index.php"
        );
    }

    #[test]
    fn test_index_page_matches_whole_segment() {
        let signals = request("/myindex.php/woot", "/");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "myindex.php/woot"
        );
    }

    #[test]
    fn test_suppressed_script_name() {
        let signals = request("/woot", "/");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "woot"
        );

        let signals = request("/index.php/woot", "/");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "woot"
        );
    }

    #[test]
    fn test_request_uri_keeps_query() {
        let detector = RoutePathDetector::new();
        let detection = detector.detect(
            &request("/index.php/woot?code=good", "/index.php"),
            "index.php",
            DetectionMethod::RequestUri,
        );
        assert_eq!(detection.route_path, "woot");
        assert_eq!(detection.query.as_deref(), Some("code=good"));
    }

    #[test]
    fn test_forwarded_query_path() {
        let detector = RoutePathDetector::new();
        let detection = detector.detect(
            &request("/?/ci/woot", "/index.php"),
            "index.php",
            DetectionMethod::RequestUri,
        );
        assert_eq!(detection.route_path, "ci/woot");
        assert_eq!(detection.query.as_deref(), Some(""));

        let detector = RoutePathDetector::new().with_forwarded_query_path(false);
        let detection = detector.detect(
            &request("/?/ci/woot", "/index.php"),
            "index.php",
            DetectionMethod::RequestUri,
        );
        assert_eq!(detection.route_path, "/");
        assert_eq!(detection.query.as_deref(), Some("/ci/woot"));
    }

    #[test]
    fn test_query_string_method_rewrites_query() {
        let signals = request("/index.php?/ci/woot?code=good", "/index.php")
            .with_query_string("/ci/woot?code=good");

        let detection = RoutePathDetector::new().detect(&signals, "index.php", DetectionMethod::QueryString);
        assert_eq!(detection.route_path, "ci/woot");
        assert_eq!(detection.query.as_deref(), Some("code=good"));
    }

    #[test]
    fn test_query_string_method_empty() {
        let detection = RoutePathDetector::new().detect(
            &request("/index.php?", "/index.php"),
            "index.php",
            DetectionMethod::QueryString,
        );
        assert_eq!(detection, RouteDetection::root());
    }

    #[test]
    fn test_path_info_falls_back_to_request_uri() {
        let signals = request("/index.php/woot", "/index.php");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::PathInfo),
            "woot"
        );

        let signals = request("/ci431/public/index.php/woot?code=good", "/ci431/public/index.php")
            .with_path_info("/woot");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::PathInfo),
            "woot"
        );
    }

    #[test]
    fn test_dot_segments_are_removed() {
        let signals = request("/index.php/fruits/../candy/./snickers", "/index.php");
        assert_eq!(
            detect_route_path(&signals, "index.php", DetectionMethod::RequestUri),
            "candy/snickers"
        );
    }

    #[test]
    fn test_detection_is_deterministic() {
        let signals = request("/sub/folder/index.php/fruits/banana", "/sub/folder/index.php");
        let detector = RoutePathDetector::new();

        let first = detector.detect(&signals, "index.php", DetectionMethod::Auto);
        let second = detector.detect(&signals, "index.php", DetectionMethod::Auto);
        assert_eq!(first, second);
        assert_eq!(first.route_path, "fruits/banana");
        assert_eq!(signals, request("/sub/folder/index.php/fruits/banana", "/sub/folder/index.php"));
    }
}

//! Raw request signals captured from the hosting environment.

use crate::models::uri::is_valid_host;
use std::collections::HashMap;

/// Server variable carrying the requested resource (path and query)
pub const REQUEST_URI: &str = "REQUEST_URI";
/// Server variable carrying the entry-script path
pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
/// Server variable carrying the raw query string
pub const QUERY_STRING: &str = "QUERY_STRING";
/// Server variable carrying the server-decoded extra path
pub const PATH_INFO: &str = "PATH_INFO";
/// Server variable carrying the Host header
pub const HTTP_HOST: &str = "HTTP_HOST";
/// Server variable carrying the peer address
pub const REMOTE_ADDR: &str = "REMOTE_ADDR";

/// Immutable snapshot of the four signals route detection works from
///
/// The snapshot is taken once per request. Detection only ever reads this
/// value, never the live environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvironmentSignals {
    pub request_uri: Option<String>,
    pub script_name: Option<String>,
    pub query_string: Option<String>,
    pub path_info: Option<String>,
}

impl RawEnvironmentSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_uri(mut self, request_uri: impl Into<String>) -> Self {
        self.request_uri = Some(request_uri.into());
        self
    }

    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = Some(script_name.into());
        self
    }

    pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = Some(query_string.into());
        self
    }

    pub fn with_path_info(mut self, path_info: impl Into<String>) -> Self {
        self.path_info = Some(path_info.into());
        self
    }

    /// Build a snapshot from CGI-style server variables
    pub fn from_server_vars(vars: &HashMap<String, String>) -> Self {
        vars.capture()
    }
}

/// Source of raw request signals
///
/// Implementors expose server variables by their CGI names. `capture` reads
/// each variable exactly once and freezes the result.
pub trait EnvironmentSnapshot {
    /// Look up a server variable
    fn server_var(&self, name: &str) -> Option<String>;

    /// Take the snapshot route detection runs against
    fn capture(&self) -> RawEnvironmentSignals {
        RawEnvironmentSignals {
            request_uri: self.server_var(REQUEST_URI),
            script_name: self.server_var(SCRIPT_NAME),
            query_string: self.server_var(QUERY_STRING),
            path_info: self.server_var(PATH_INFO),
        }
    }

    /// Requested hostname without any port. Values that are not a valid
    /// URI host are dropped.
    fn host(&self) -> Option<String> {
        self.server_var(HTTP_HOST).and_then(|host_port| {
            let host = strip_port(host_port.trim());
            (!host.is_empty() && is_valid_host(host)).then(|| host.to_ascii_lowercase())
        })
    }

    /// Peer address as reported by the server
    fn remote_addr(&self) -> Option<String> {
        self.server_var(REMOTE_ADDR)
    }
}

impl EnvironmentSnapshot for HashMap<String, String> {
    fn server_var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Drop a `:port` suffix from a Host value, keeping bracketed IPv6 literals whole
pub fn strip_port(host_port: &str) -> &str {
    if host_port.starts_with('[') {
        return match host_port.find(']') {
            Some(end) => &host_port[..=end],
            None => host_port,
        };
    }

    host_port
        .split_once(':')
        .map_or(host_port, |(host, _)| host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_capture_from_server_vars() {
        let vars = server(&[
            (REQUEST_URI, "/index.php/woot?code=good"),
            (SCRIPT_NAME, "/index.php"),
            (QUERY_STRING, "code=good"),
        ]);

        let signals = RawEnvironmentSignals::from_server_vars(&vars);
        assert_eq!(
            signals,
            RawEnvironmentSignals::new()
                .with_request_uri("/index.php/woot?code=good")
                .with_script_name("/index.php")
                .with_query_string("code=good")
        );
        assert!(signals.path_info.is_none());
    }

    #[test]
    fn test_snapshot_does_not_follow_later_changes() {
        let mut vars = server(&[(REQUEST_URI, "/fruits/banana")]);
        let signals = vars.capture();

        vars.insert(REQUEST_URI.to_string(), "/candy/snickers".to_string());
        assert_eq!(signals.request_uri.as_deref(), Some("/fruits/banana"));
    }

    #[test]
    fn test_host_strips_port() {
        let vars = server(&[(HTTP_HOST, "Example.com:8080")]);
        assert_eq!(vars.host().as_deref(), Some("example.com"));

        let vars = server(&[(HTTP_HOST, "[::1]:8080")]);
        assert_eq!(vars.host().as_deref(), Some("[::1]"));

        assert_eq!(server(&[]).host(), None);
    }

    #[test]
    fn test_host_rejects_invalid_values() {
        for host in ["evil.com/x?y=1#", "user@evil.com", "evil.com#", "[::1"] {
            assert_eq!(server(&[(HTTP_HOST, host)]).host(), None, "host {host:?}");
        }
    }
}

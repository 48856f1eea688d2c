//! The URI of the current request as seen by the application.
//!
//! A `SiteUri` separates the part of the path owned by the deployment (base
//! URL subfolder and index page) from the route path the router dispatches
//! on. Both views stay in sync: changing the route path or one of its
//! segments re-renders the full URI.

use crate::{
    config::AppConfig,
    models::{
        IdentityError, Uri, UriError,
        uri::{decode_path, normalize_path_encoding, remove_dot_segments},
    },
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteUri {
    uri: Uri,
    base_url: String,
    index_page: String,
    /// Base URL path segments followed by the index page, if any
    base_segments: Vec<String>,
    /// Route path segments, percent-encoded
    segments: Vec<String>,
    route_path: String,
    trailing_slash: bool,
    silent: bool,
}

impl SiteUri {
    /// Build the visible URI for `relative_path` (route path plus optional
    /// query and fragment) under the configured base URL.
    ///
    /// `host` replaces the base URL host only when the configuration allows
    /// it. An explicit `scheme` wins over `force_global_secure_requests`.
    pub fn new(
        config: &AppConfig,
        relative_path: &str,
        host: Option<&str>,
        scheme: Option<&str>,
    ) -> Result<Self, IdentityError> {
        let base_url = config.normalized_base_url()?;
        let mut uri = Uri::parse(&base_url)?;

        let mut base_segments: Vec<String> = uri
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        if !config.index_page.is_empty() {
            base_segments.push(config.index_page.clone());
        }

        match scheme.filter(|s| !s.is_empty()) {
            Some(scheme) => {
                uri.set_scheme(scheme);
            }
            None if config.force_global_secure_requests => {
                uri.set_scheme("https");
            }
            None => {}
        }

        // A host that cannot be rendered safely keeps the base URL host
        if let Some(host) = host.filter(|h| !h.is_empty() && config.is_allowed_host(h))
            && let Err(e) = uri.set_host(host)
        {
            tracing::warn!(host = %host, error = %e, "Ignoring invalid request host");
        }

        let (rest, fragment) = relative_path
            .split_once('#')
            .unwrap_or((relative_path, ""));
        let (route_path, query) = rest.split_once('?').unwrap_or((rest, ""));

        uri.set_query(query)?;
        uri.set_fragment(fragment);

        let mut site_uri = Self {
            uri,
            base_url,
            index_page: config.index_page.clone(),
            base_segments,
            segments: Vec::new(),
            route_path: "/".to_string(),
            trailing_slash: false,
            silent: false,
        };
        site_uri.set_route_path(route_path);

        Ok(site_uri)
    }

    /// Slash-terminated base URL from the configuration
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn index_page(&self) -> &str {
        &self.index_page
    }

    /// Path relative to the base URL and index page, `/` for the root
    pub fn route_path(&self) -> &str {
        &self.route_path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn total_segments(&self) -> usize {
        self.segments.len()
    }

    /// Route segment by 1-based number
    pub fn segment(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.segments.get(index))
            .map(String::as_str)
    }

    /// Route segment by 1-based number; out of range fails unless silent
    pub fn get_segment<'a>(&'a self, number: usize, default: &'a str) -> Result<&'a str, UriError> {
        match self.segment(number) {
            Some(segment) => Ok(segment),
            None if self.silent && number > 0 => Ok(default),
            None => Err(UriError::SegmentOutOfRange(number)),
        }
    }

    /// Replace an existing route segment and re-render the URI
    pub fn set_segment(&mut self, number: usize, value: &str) -> Result<&mut Self, UriError> {
        if number == 0 || number > self.segments.len() {
            if self.silent {
                return Ok(self);
            }
            return Err(UriError::SegmentOutOfRange(number));
        }

        self.segments[number - 1] = normalize_path_encoding(value.trim_matches('/'));
        self.refresh_path();

        Ok(self)
    }

    pub fn set_silent(&mut self, silent: bool) -> &mut Self {
        self.silent = silent;
        self
    }

    /// Replace the route path. Dot segments and duplicate slashes are removed.
    pub fn set_route_path(&mut self, path: &str) -> &mut Self {
        let path = normalize_path_encoding(&remove_dot_segments(path));

        self.trailing_slash = path.ends_with('/');
        self.segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        self.refresh_path();

        self
    }

    /// Replace the query from its string form
    pub fn set_query(&mut self, query: &str) -> Result<&mut Self, UriError> {
        self.uri.set_query(query)?;
        Ok(self)
    }

    /// Full path including base subfolder and index page, percent-encoded
    pub fn path(&self) -> String {
        self.uri.path()
    }

    pub fn query(&self) -> String {
        self.uri.query()
    }

    pub fn scheme(&self) -> &str {
        self.uri.scheme()
    }

    pub fn host(&self) -> &str {
        self.uri.host()
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    fn refresh_path(&mut self) {
        let has_segments = !self.segments.is_empty();
        let trailing = has_segments && self.trailing_slash;

        self.route_path = if has_segments {
            let mut route = self.segments.join("/");
            if trailing {
                route.push('/');
            }
            route
        } else {
            "/".to_string()
        };

        let all: Vec<&str> = self
            .base_segments
            .iter()
            .chain(self.segments.iter())
            .map(String::as_str)
            .collect();

        let mut path = format!("/{}", all.join("/"));
        if !all.is_empty() && (trailing || !has_segments) {
            path.push('/');
        }

        self.uri.set_decoded_path(decode_path(&path));
    }
}

impl fmt::Display for SiteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uri, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, index_page: &str) -> AppConfig {
        AppConfig {
            base_url: base_url.to_string(),
            index_page: index_page.to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_route_path_and_full_path() {
        let uri = SiteUri::new(&config("http://example.com/", "index.php"), "woot", None, None).unwrap();

        assert_eq!(uri.route_path(), "woot");
        assert_eq!(uri.path(), "/index.php/woot");
        assert_eq!(uri.to_string(), "http://example.com/index.php/woot");
        assert_eq!(uri.segments(), ["woot".to_string()]);
    }

    #[test]
    fn test_subfolder_base_url() {
        let uri = SiteUri::new(
            &config("http://example.com/ci4", ""),
            "/popcorn/woot?code=good#notes",
            None,
            None,
        )
        .unwrap();

        assert_eq!(uri.base_url(), "http://example.com/ci4/");
        assert_eq!(uri.route_path(), "popcorn/woot");
        assert_eq!(uri.total_segments(), 2);
        assert_eq!(uri.to_string(), "http://example.com/ci4/popcorn/woot?code=good#notes");
    }

    #[test]
    fn test_root_route() {
        let uri = SiteUri::new(&config("http://example.com/", ""), "", None, None).unwrap();
        assert_eq!(uri.route_path(), "/");
        assert_eq!(uri.to_string(), "http://example.com/");

        let uri = SiteUri::new(&config("http://example.com/", "index.php"), "/", None, None).unwrap();
        assert_eq!(uri.route_path(), "/");
        assert_eq!(uri.to_string(), "http://example.com/index.php/");
        assert_eq!(uri.total_segments(), 0);
    }

    #[test]
    fn test_dot_segments_and_duplicate_slashes() {
        let uri = SiteUri::new(&config("http://example.com/", ""), "a//b/../c/", None, None).unwrap();
        assert_eq!(uri.route_path(), "a/c/");
        assert_eq!(uri.path(), "/a/c/");
    }

    #[test]
    fn test_forced_https_and_explicit_scheme() {
        let mut secure = config("http://example.com/", "");
        secure.force_global_secure_requests = true;

        let uri = SiteUri::new(&secure, "woot", None, None).unwrap();
        assert_eq!(uri.to_string(), "https://example.com/woot");

        let uri = SiteUri::new(&secure, "woot", None, Some("ftp")).unwrap();
        assert_eq!(uri.scheme(), "ftp");
    }

    #[test]
    fn test_host_must_be_allowed() {
        let mut restricted = config("http://example.com/", "");
        restricted.allowed_hostnames = vec!["sub.example.com".to_string()];

        let uri = SiteUri::new(&restricted, "woot", Some("sub.example.com"), None).unwrap();
        assert_eq!(uri.host(), "sub.example.com");

        let uri = SiteUri::new(&restricted, "woot", Some("evil.example.net"), None).unwrap();
        assert_eq!(uri.host(), "example.com");
    }

    #[test]
    fn test_malformed_host_keeps_base_host() {
        let open = config("http://example.com/", "index.php");

        let uri = SiteUri::new(&open, "woot", Some("evil.com/x?y=1#"), None).unwrap();
        let rendered = uri.to_string();
        assert_eq!(rendered, "http://example.com/index.php/woot");

        let reparsed = Uri::parse(&rendered).unwrap();
        assert_eq!(reparsed.host(), uri.host());
        assert_eq!(reparsed.path(), uri.path());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = SiteUri::new(&config("invalid", ""), "woot", None, None).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_segments_strict_and_silent() {
        let mut uri = SiteUri::new(&config("http://example.com/", "index.php"), "a/b", None, None).unwrap();

        assert_eq!(uri.get_segment(2, ""), Ok("b"));
        assert_eq!(uri.get_segment(3, ""), Err(UriError::SegmentOutOfRange(3)));
        assert_eq!(uri.get_segment(0, ""), Err(UriError::SegmentOutOfRange(0)));
        assert!(uri.set_segment(3, "c").is_err());

        uri.set_silent(true);
        assert_eq!(uri.get_segment(3, "fallback"), Ok("fallback"));
        uri.set_segment(3, "c").unwrap();
        assert_eq!(uri.route_path(), "a/b");
    }

    #[test]
    fn test_set_segment_rerenders() {
        let mut uri = SiteUri::new(&config("http://example.com/ci4/", "index.php"), "users/15?tab=posts", None, None)
            .unwrap();

        uri.set_segment(2, "42").unwrap();
        assert_eq!(uri.route_path(), "users/42");
        assert_eq!(uri.path(), "/ci4/index.php/users/42");
        assert_eq!(uri.to_string(), "http://example.com/ci4/index.php/users/42?tab=posts");
    }

    #[test]
    fn test_set_route_path() {
        let mut uri = SiteUri::new(&config("http://example.com/", ""), "woot", None, None).unwrap();
        uri.set_route_path("/fruits/banana/");

        assert_eq!(uri.route_path(), "fruits/banana/");
        assert_eq!(uri.segment(1), Some("fruits"));
        assert_eq!(uri.to_string(), "http://example.com/fruits/banana/");
    }
}

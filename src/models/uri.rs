//! RFC 3986 URI value type.
//!
//! `Uri` parses a URI reference into its components, keeps the path
//! percent-decoded internally and re-encodes it on render. Dot segments are
//! removed (RFC 3986 §5.2.4) as soon as the path is anchored, i.e. absolute or
//! attached to a scheme/authority. Rootless relative references keep their
//! dot segments until they are resolved against a base.
//!
//! The query is stored as an ordered list of key/value pairs so that a parsed
//! query renders back in the order it arrived, while lookups and updates are
//! done by key.

use crate::models::error::UriError;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use std::{fmt, str::FromStr, sync::LazyLock};
use url::form_urlencoded;

/// Component splitter from RFC 3986 Appendix B
static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("URI component pattern is valid")
});

static SCHEME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("scheme pattern is valid"));

/// Characters re-encoded when a decoded path is rendered
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Ports omitted from the rendered authority for their scheme
const DEFAULT_PORTS: &[(&str, u16)] = &[("http", 80), ("https", 443), ("ftp", 21), ("sftp", 22)];

/// Look up the default port for a scheme
pub fn default_port(scheme: &str) -> Option<u16> {
    DEFAULT_PORTS
        .iter()
        .find(|(name, _)| *name == scheme)
        .map(|(_, port)| *port)
}

/// A parsed URI reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    user: Option<String>,
    password: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    query: Vec<(String, Option<String>)>,
    fragment: String,
    show_password: bool,
    silent: bool,
}

impl Uri {
    /// Parse a URI or relative reference
    ///
    /// Nothing partially parsed is ever returned: any malformed component
    /// fails the whole parse.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let unable = || UriError::UnableToParse(input.to_string());

        if input.chars().any(|c| c.is_control() || c == ' ') {
            return Err(unable());
        }

        let captures = URI_PATTERN.captures(input).ok_or_else(unable)?;
        let mut uri = Uri::default();

        if let Some(scheme) = captures.get(1) {
            if !SCHEME_PATTERN.is_match(scheme.as_str()) {
                return Err(unable());
            }
            uri.scheme = scheme.as_str().to_ascii_lowercase();
        }

        if let Some(authority) = captures.get(2) {
            uri.apply_authority(authority.as_str())?;
            if uri.host.is_empty() && !uri.scheme.is_empty() && uri.scheme != "file" {
                return Err(unable());
            }
        }

        let raw_path = captures.get(3).map_or("", |m| m.as_str());
        uri.path = uri.filter_path(raw_path);

        if let Some(query) = captures.get(4) {
            uri.set_query(query.as_str())?;
        }

        if let Some(fragment) = captures.get(5) {
            uri.fragment = fragment.as_str().to_string();
        }

        Ok(uri)
    }

    /// Scheme, lowercased. Empty for relative references.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host, lowercased. IPv6 literals keep their brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if one was given
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// User information in `user[:password]` form.
    ///
    /// The password only appears once `reveal_password(true)` was called.
    pub fn user_info(&self) -> String {
        let mut user_info = self.user.clone().unwrap_or_default();

        if self.show_password
            && let Some(password) = self.password.as_deref().filter(|p| !p.is_empty())
        {
            user_info.push(':');
            user_info.push_str(password);
        }

        user_info
    }

    /// Authority in `[user-info@]host[:port]` form, omitting a default port
    pub fn authority(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }

        let mut authority = String::new();

        let user_info = self.user_info();
        if !user_info.is_empty() {
            authority.push_str(&user_info);
            authority.push('@');
        }

        authority.push_str(&self.host);

        if let Some(port) = self.port
            && default_port(&self.scheme) != Some(port)
        {
            authority.push(':');
            authority.push_str(&port.to_string());
        }

        authority
    }

    /// Path, percent-encoded
    pub fn path(&self) -> String {
        encode_path(&self.path)
    }

    /// Path, percent-decoded except for `%2F` and `%25`
    pub fn decoded_path(&self) -> &str {
        &self.path
    }

    /// Rendered query string without the leading `?`
    pub fn query(&self) -> String {
        render_query(self.query.iter())
    }

    /// Rendered query string containing only the given keys
    pub fn query_only(&self, keys: &[&str]) -> String {
        render_query(
            self.query
                .iter()
                .filter(|(key, _)| keys.contains(&key.as_str())),
        )
    }

    /// Rendered query string without the given keys
    pub fn query_except(&self, keys: &[&str]) -> String {
        render_query(
            self.query
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str())),
        )
    }

    /// Query pairs in insertion order
    pub fn query_pairs(&self) -> &[(String, Option<String>)] {
        &self.query
    }

    /// Value of a query variable. A key given without `=` yields `Some("")`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    /// Path segments (decoded), empty segments dropped
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn total_segments(&self) -> usize {
        self.segments().len()
    }

    /// Segment by 1-based number
    pub fn segment(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.segments().get(index).copied())
    }

    /// Segment by 1-based number, honoring silent mode.
    ///
    /// Out of range numbers fail with `SegmentOutOfRange` unless silent mode
    /// is on, in which case `default` is returned.
    pub fn get_segment<'a>(&'a self, number: usize, default: &'a str) -> Result<&'a str, UriError> {
        match self.segment(number) {
            Some(segment) => Ok(segment),
            None if self.silent => Ok(default),
            None => Err(UriError::SegmentOutOfRange(number)),
        }
    }

    /// Replace an existing segment. Out of range numbers fail unless silent
    /// mode is on, in which case nothing changes.
    pub fn set_segment(&mut self, number: usize, value: &str) -> Result<&mut Self, UriError> {
        let mut segments: Vec<String> = self.segments().into_iter().map(str::to_string).collect();

        if number == 0 || number > segments.len() {
            if self.silent {
                return Ok(self);
            }
            return Err(UriError::SegmentOutOfRange(number));
        }

        segments[number - 1] = decode_path(&encode_path(value));

        let leading = self.path.starts_with('/') || self.has_authority();
        let trailing = self.path.ends_with('/');
        let mut path = String::new();
        if leading {
            path.push('/');
        }
        path.push_str(&segments.join("/"));
        if trailing {
            path.push('/');
        }
        self.path = path;

        Ok(self)
    }

    /// Toggle silent mode for segment access on this instance
    pub fn set_silent(&mut self, silent: bool) -> &mut Self {
        self.silent = silent;
        self
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Include the password in `user_info`, `authority` and the rendered
    /// string for the lifetime of this instance
    pub fn reveal_password(&mut self, reveal: bool) -> &mut Self {
        self.show_password = reveal;
        self
    }

    pub fn set_scheme(&mut self, scheme: &str) -> &mut Self {
        let scheme = scheme.to_ascii_lowercase();
        let scheme = scheme
            .strip_suffix("://")
            .or_else(|| scheme.strip_suffix(':'))
            .unwrap_or(&scheme);
        self.scheme = scheme.to_string();
        self
    }

    /// Replace the host. Values that could not be re-parsed as a host, such
    /// as ones carrying `/`, `?`, `#` or `@`, are rejected.
    pub fn set_host(&mut self, host: &str) -> Result<&mut Self, UriError> {
        let host = host.trim();
        if host.is_empty() || !is_valid_host(host) {
            return Err(UriError::UnableToParse(host.to_string()));
        }
        self.host = host.to_ascii_lowercase();
        Ok(self)
    }

    /// Set or clear the port. Only 1..=65535 is accepted.
    pub fn set_port(&mut self, port: Option<u16>) -> Result<&mut Self, UriError> {
        if port == Some(0) {
            return Err(UriError::InvalidPort("0".to_string()));
        }
        self.port = port;
        Ok(self)
    }

    pub fn set_user_info(&mut self, user: &str, password: &str) -> &mut Self {
        let user = user.trim();
        let password = password.trim();
        self.user = (!user.is_empty()).then(|| user.to_string());
        self.password = (!password.is_empty()).then(|| password.to_string());
        self
    }

    /// Replace the authority from `[user-info@]host[:port]`
    pub fn set_authority(&mut self, authority: &str) -> Result<&mut Self, UriError> {
        let authority = authority.strip_prefix("//").unwrap_or(authority);
        self.apply_authority(authority)?;
        Ok(self)
    }

    /// Set the path from its encoded form
    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.path = self.filter_path(path);
        self
    }

    /// Set an already decoded, already normalized path
    pub(crate) fn set_decoded_path(&mut self, path: String) {
        self.path = path;
    }

    pub fn set_fragment(&mut self, fragment: &str) -> &mut Self {
        self.fragment = fragment.trim_matches(|c| c == '#' || c == ' ').to_string();
        self
    }

    /// Replace the query from its string form. A leading `?` is ignored.
    pub fn set_query(&mut self, query: &str) -> Result<&mut Self, UriError> {
        if query.contains('#') {
            return Err(UriError::MalformedQueryString);
        }

        let query = query.strip_prefix('?').unwrap_or(query);
        let mut pairs = Vec::new();

        for part in query.split('&').filter(|part| !part.is_empty()) {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (decode_query_component(key), Some(decode_query_component(value))),
                None => (decode_query_component(part), None),
            };
            upsert(&mut pairs, key, value);
        }

        self.query = pairs;
        Ok(self)
    }

    /// Replace the query from key/value pairs, keeping their order
    pub fn set_query_from_pairs<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut query = Vec::new();
        for (key, value) in pairs {
            upsert(&mut query, key.into(), Some(value.into()));
        }
        self.query = query;
        self
    }

    /// Add or replace a single query variable. Existing keys keep their position.
    pub fn add_query(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        upsert(&mut self.query, key.to_string(), value.map(str::to_string));
        self
    }

    /// Remove the given query variables
    pub fn strip_query(&mut self, keys: &[&str]) -> &mut Self {
        self.query.retain(|(key, _)| !keys.contains(&key.as_str()));
        self
    }

    /// Keep only the given query variables
    pub fn keep_query(&mut self, keys: &[&str]) -> &mut Self {
        self.query.retain(|(key, _)| keys.contains(&key.as_str()));
        self
    }

    /// Resolve a reference against this URI (RFC 3986 §5.2.2, strict)
    pub fn resolve_relative_reference(&self, reference: &Uri) -> Uri {
        let mut target = reference.clone();
        target.show_password = false;
        target.silent = self.silent;

        if !reference.scheme.is_empty() {
            target.path = remove_dot_segments(&reference.path);
            return target;
        }

        if reference.has_authority() {
            target.path = remove_dot_segments(&reference.path);
        } else {
            if reference.path.is_empty() {
                target.path = self.path.clone();
                if reference.query.is_empty() {
                    target.query = self.query.clone();
                }
            } else if reference.path.starts_with('/') {
                target.path = remove_dot_segments(&reference.path);
            } else {
                target.path = remove_dot_segments(&self.merge_path(&reference.path));
            }

            target.user = self.user.clone();
            target.password = self.password.clone();
            target.host = self.host.clone();
            target.port = self.port;
        }

        target.scheme = self.scheme.clone();
        target
    }

    /// Parse `reference` and resolve it against this URI
    pub fn resolve(&self, reference: &str) -> Result<Uri, UriError> {
        Ok(self.resolve_relative_reference(&Uri::parse(reference)?))
    }

    fn has_authority(&self) -> bool {
        !self.host.is_empty()
    }

    /// RFC 3986 §5.2.3
    fn merge_path(&self, reference_path: &str) -> String {
        if self.has_authority() && self.path.is_empty() {
            return format!("/{reference_path}");
        }

        match self.path.rfind('/') {
            Some(index) => format!("{}{}", &self.path[..=index], reference_path),
            None => reference_path.to_string(),
        }
    }

    fn filter_path(&self, raw: &str) -> String {
        let decoded = decode_path(raw);
        let anchored = decoded.starts_with('/') || self.has_authority() || !self.scheme.is_empty();

        if anchored {
            remove_dot_segments(&decoded)
        } else {
            decoded
        }
    }

    fn apply_authority(&mut self, authority: &str) -> Result<(), UriError> {
        let (user_info, host_port) = match authority.rsplit_once('@') {
            Some((user_info, host_port)) => (Some(user_info), host_port),
            None => (None, authority),
        };

        let (host, port) = split_host_port(host_port)?;

        if let Some(user_info) = user_info {
            let (user, password) = match user_info.split_once(':') {
                Some((user, password)) => (user, Some(password)),
                None => (user_info, None),
            };
            self.user = Some(user.to_string());
            self.password = password.map(str::to_string);
        }

        self.host = host.to_ascii_lowercase();
        self.port = port;
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }

        let authority = self.authority();
        if !authority.is_empty() {
            write!(f, "//{authority}")?;
        }

        let path = self.path();
        if !authority.is_empty() && !path.is_empty() && !path.starts_with('/') {
            f.write_str("/")?;
        }
        f.write_str(&path)?;

        let query = self.query();
        if !query.is_empty() {
            write!(f, "?{query}")?;
        }

        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }

        Ok(())
    }
}

/// Remove `.` and `..` segments following RFC 3986 §5.2.4.
///
/// `/.` and `/..` become `/`; a bare `.` or `..` becomes empty.
pub fn remove_dot_segments(path: &str) -> String {
    let mut input = path.to_string();
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if input.starts_with("../") {
            input.drain(..3);
        } else if input.starts_with("./") {
            input.drain(..2);
        } else if input.starts_with("/./") {
            input.drain(..2);
        } else if input == "/." {
            input.truncate(1);
        } else if input.starts_with("/../") {
            input.drain(..3);
            pop_last_segment(&mut output);
        } else if input == "/.." {
            input.truncate(1);
            pop_last_segment(&mut output);
        } else if input == "." || input == ".." {
            input.clear();
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |index| index + start);
            output.extend(input.drain(..end));
        }
    }

    output
}

fn pop_last_segment(output: &mut String) {
    match output.rfind('/') {
        Some(index) => output.truncate(index),
        None => output.clear(),
    }
}

/// Percent-decode a path.
///
/// `%2F` and `%25` stay encoded so that decoding never adds a segment
/// boundary and a decoded `%` is always the start of an escape.
pub(crate) fn decode_path(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(index) = find_kept_escape(rest) {
        decoded.push_str(&percent_decode_str(&rest[..index]).decode_utf8_lossy());
        decoded.push('%');
        decoded.push_str(&rest[index + 1..index + 3].to_ascii_uppercase());
        rest = &rest[index + 3..];
    }
    decoded.push_str(&percent_decode_str(rest).decode_utf8_lossy());

    decoded
}

fn find_kept_escape(raw: &str) -> Option<usize> {
    raw.match_indices('%').map(|(index, _)| index).find(|&index| {
        raw.get(index + 1..index + 3)
            .is_some_and(|hex| hex.eq_ignore_ascii_case("2F") || hex == "25")
    })
}

/// Percent-encode a decoded path, leaving `/`, RFC 3986 path characters and
/// existing escapes alone
pub(crate) fn encode_path(decoded: &str) -> String {
    let mut encoded = String::with_capacity(decoded.len());
    let mut rest = decoded;

    while let Some(index) = rest.find('%') {
        encoded.extend(utf8_percent_encode(&rest[..index], PATH_ENCODE_SET));

        match rest
            .get(index + 1..index + 3)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
        {
            Some(hex) => {
                encoded.push('%');
                encoded.push_str(&hex.to_ascii_uppercase());
                rest = &rest[index + 3..];
            }
            None => {
                encoded.push_str("%25");
                rest = &rest[index + 1..];
            }
        }
    }
    encoded.extend(utf8_percent_encode(rest, PATH_ENCODE_SET));

    encoded
}

/// Bring a raw path into canonical encoding (decode, then re-encode)
pub(crate) fn normalize_path_encoding(raw: &str) -> String {
    encode_path(&decode_path(raw))
}

fn split_host_port(input: &str) -> Result<(&str, Option<u16>), UriError> {
    let unable = || UriError::UnableToParse(input.to_string());

    let (host, port) = if input.starts_with('[') {
        let end = input.find(']').ok_or_else(unable)?;
        let rest = &input[end + 1..];
        match rest.strip_prefix(':') {
            Some(port) => (&input[..=end], Some(port)),
            None if rest.is_empty() => (&input[..=end], None),
            None => return Err(unable()),
        }
    } else {
        match input.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (input, None),
        }
    };

    if !is_valid_host(host) {
        return Err(unable());
    }

    let port = match port {
        None | Some("") => None,
        Some(port) => Some(parse_port(port)?),
    };

    Ok((host, port))
}

/// Whether `host` is a reg-name or a bracketed IP literal per RFC 3986 §3.2.2
pub(crate) fn is_valid_host(host: &str) -> bool {
    if let Some(literal) = host.strip_prefix('[') {
        return literal.strip_suffix(']').is_some_and(|inner| {
            !inner.is_empty()
                && inner
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:".contains(c))
        });
    }

    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=%".contains(c) || !c.is_ascii())
}

fn parse_port(raw: &str) -> Result<u16, UriError> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UriError::UnableToParse(format!("port {raw}")));
    }

    match raw.parse::<u32>() {
        Ok(port) if (1..=65535).contains(&port) => Ok(port as u16),
        _ => Err(UriError::InvalidPort(raw.to_string())),
    }
}

fn decode_query_component(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

fn render_query<'a>(pairs: impl Iterator<Item = &'a (String, Option<String>)>) -> String {
    pairs
        .map(|(key, value)| {
            let key: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
            match value {
                Some(value) => {
                    let value: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
                    format!("{key}={value}")
                }
                None => key,
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn upsert(pairs: &mut Vec<(String, Option<String>)>, key: String, value: Option<String>) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some((_, existing)) => *existing = value,
        None => pairs.push((key, value)),
    }
}

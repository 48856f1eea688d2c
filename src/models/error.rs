//! Error types for URI handling, configuration and request identity resolution.

/// Errors raised while parsing or mutating a URI
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("Unable to parse URI: {0}")]
    UnableToParse(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Query string must not contain a fragment delimiter")]
    MalformedQueryString,

    #[error("URI segment is out of range: {0}")]
    SegmentOutOfRange(usize),
}

/// Errors raised for invalid application configuration
///
/// These are fatal at startup and are never replaced by a default value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Configured base URL is invalid: {0}")]
    InvalidBaseUrl(String),

    #[error("Proxy IPs must map a proxy address or subnet to a header name: {0}")]
    InvalidProxyTable(String),

    #[error("Invalid proxy address or subnet: {0}")]
    InvalidProxyAddress(String),
}

/// Errors from operations that touch both URIs and configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    Uri(#[from] UriError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IdentityError {
    /// Whether this error comes from configuration rather than request data
    pub fn is_configuration(&self) -> bool {
        matches!(self, IdentityError::Config(_))
    }
}

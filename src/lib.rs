//! Request Identity - request URI, route path and client IP resolution
//!
//! Given the raw signals a web server hands to an application (request
//! target, entry-script path, query string, peer address and forwarding
//! headers), this crate:
//! - reconstructs a normalized RFC 3986 URI for the request
//! - derives the route path the router dispatches on, independent of
//!   subfolder deployment and index-page rewrites
//! - resolves the real client IP, trusting forwarding headers only from
//!   configured proxies
//!
//! ## Architecture
//!
//! The codebase is organized into focused modules:
//! - `models/` - `Uri`, `SiteUri`, environment signals, errors and API models
//! - `services/` - route path detection, site URI factory, IP detection, metrics
//! - `handlers/` - HTTP request handlers for each endpoint
//! - `middleware/` - identity resolution, request IDs and metrics
//! - `utils/` - actix request adapters
//! - `config/` - configuration structures and environment loading
//! - `telemetry` - tracing subscriber setup and request log fields
//!
//! ## Quick Start
//!
//! ```no_run
//! use request_identity::{AppConfig, RawEnvironmentSignals, SiteUriFactory};
//!
//! let signals = RawEnvironmentSignals::new()
//!     .with_request_uri("/index.php/woot?code=good")
//!     .with_script_name("/index.php");
//! let config = AppConfig {
//!     base_url: "http://example.com/".to_string(),
//!     index_page: "index.php".to_string(),
//!     ..AppConfig::default()
//! };
//!
//! let factory = SiteUriFactory::from_signals(config, signals, None);
//! let site_uri = factory.create_from_environment().unwrap();
//! assert_eq!(site_uri.route_path(), "woot");
//! ```

// Core modules
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod utils;

// Re-export commonly used types and functions for convenience
pub use config::{AppConfig, MetricsConfig, ProxyMatcher, ProxyTable, ProxyTrustEntry};
pub use handlers::{create_app, create_base_app, create_openapi_spec, get_metrics, health, identity, version};
pub use middleware::{MetricsMiddleware, RequestIdMiddleware, RequestIdentityMiddleware};
pub use models::{
    ConfigError, EnvironmentSnapshot, HealthResponse, IdentityError, IdentityResponse,
    RawEnvironmentSignals, RequestIdentity, ResolvedClientIp, SiteUri, Uri, UriError,
    VersionResponse, remove_dot_segments,
};
pub use services::{
    AppMetrics, DetectionMethod, IpAddressDetector, RouteDetection, RoutePathDetector,
    SiteUriFactory, detect_client_ip, detect_route_path,
};
pub use telemetry::{LogFormat, TelemetryConfig, init_tracing};
pub use utils::{extract_client_ip, extract_route_pattern, extract_user_agent, resolve_request_identity};

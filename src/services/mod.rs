//! Business logic and service layer modules.
//!
//! This module contains route path detection, site URI construction, client
//! IP resolution and metrics collection.

pub mod ip_address;
pub mod metrics;
pub mod route_path;
pub mod site_uri_factory;

pub use ip_address::{IpAddressDetector, detect_client_ip};
pub use metrics::*;
pub use route_path::{DetectionMethod, RouteDetection, RoutePathDetector, detect_route_path};
pub use site_uri_factory::SiteUriFactory;

//! API response models for standard endpoints.

use crate::models::RequestIdentity;
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

/// Response model for the health check endpoint
#[derive(Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response model for the version information endpoint
#[derive(Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct VersionResponse {
    pub version: String,
    pub commit: String,
    pub build_time: String,
}

/// Response model for the request identity endpoint
#[derive(Clone, Debug, Serialize, Deserialize, Apiv2Schema)]
pub struct IdentityResponse {
    /// Canonical absolute URL of the request (e.g. "http://example.com/index.php/woot")
    pub uri: String,
    /// Configured base URL, always slash-terminated
    pub base_url: String,
    /// Path the router dispatches on, "/" for the root
    pub route_path: String,
    pub segments: Vec<String>,
    pub total_segments: usize,
    /// Client address after trusted-proxy resolution
    pub client_ip: String,
    /// One of "peer", "forwarded" or "unspecified"
    pub client_ip_source: String,
    /// Route detection method (e.g. "REQUEST_URI")
    pub detection_method: String,
}

impl From<&RequestIdentity> for IdentityResponse {
    fn from(identity: &RequestIdentity) -> Self {
        let site_uri = &identity.site_uri;

        Self {
            uri: site_uri.to_string(),
            base_url: site_uri.base_url().to_string(),
            route_path: site_uri.route_path().to_string(),
            segments: site_uri.segments().to_vec(),
            total_segments: site_uri.total_segments(),
            client_ip: identity.client_ip().to_string(),
            client_ip_source: identity.client_ip.source().to_string(),
            detection_method: identity.detection_method.as_str().to_string(),
        }
    }
}

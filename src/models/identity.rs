//! Per-request identity: the visible site URI plus the resolved client address.

use crate::{models::SiteUri, services::route_path::DetectionMethod};

/// Client address after trusted-proxy resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedClientIp {
    /// The immediate peer, untouched
    Peer(String),
    /// Taken from a header supplied by a trusted proxy
    Forwarded { ip: String, header: String },
    /// The peer address was not a valid IP literal
    Unspecified,
}

impl ResolvedClientIp {
    pub fn ip(&self) -> &str {
        match self {
            ResolvedClientIp::Peer(ip) | ResolvedClientIp::Forwarded { ip, .. } => ip,
            ResolvedClientIp::Unspecified => crate::services::ip_address::UNSPECIFIED_ADDRESS,
        }
    }

    pub fn into_ip(self) -> String {
        match self {
            ResolvedClientIp::Peer(ip) | ResolvedClientIp::Forwarded { ip, .. } => ip,
            ResolvedClientIp::Unspecified => crate::services::ip_address::UNSPECIFIED_ADDRESS.to_string(),
        }
    }

    /// Label used in logs and metrics
    pub fn source(&self) -> &'static str {
        match self {
            ResolvedClientIp::Peer(_) => "peer",
            ResolvedClientIp::Forwarded { .. } => "forwarded",
            ResolvedClientIp::Unspecified => "unspecified",
        }
    }
}

/// Identity resolved once per request and stored in the request extensions
#[derive(Clone, Debug)]
pub struct RequestIdentity {
    pub site_uri: SiteUri,
    pub client_ip: ResolvedClientIp,
    pub detection_method: DetectionMethod,
}

impl RequestIdentity {
    pub fn route_path(&self) -> &str {
        self.site_uri.route_path()
    }

    pub fn client_ip(&self) -> &str {
        self.client_ip.ip()
    }
}

//! HTTP utility functions for extracting request information.

use crate::{
    config::AppConfig,
    models::{
        EnvironmentSnapshot, IdentityError, RequestIdentity,
        environment::{HTTP_HOST, PATH_INFO, QUERY_STRING, REMOTE_ADDR, REQUEST_URI, SCRIPT_NAME},
    },
    services::{IpAddressDetector, SiteUriFactory, ip_address::UNSPECIFIED_ADDRESS},
};
use actix_web::{HttpMessage, HttpRequest, http::header};

/// Server variables of an actix request
///
/// The request target stands in for `REQUEST_URI` and the configured entry
/// script for `SCRIPT_NAME`. Actix never supplies `PATH_INFO`.
pub struct RequestEnvironment<'a> {
    req: &'a HttpRequest,
    script_name: &'a str,
}

impl<'a> RequestEnvironment<'a> {
    pub fn new(req: &'a HttpRequest, script_name: &'a str) -> Self {
        Self { req, script_name }
    }
}

impl EnvironmentSnapshot for RequestEnvironment<'_> {
    fn server_var(&self, name: &str) -> Option<String> {
        match name {
            REQUEST_URI => Some(
                self.req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| self.req.path().to_string()),
            ),
            SCRIPT_NAME => Some(self.script_name.to_string()),
            QUERY_STRING => Some(self.req.query_string().to_string()),
            PATH_INFO => None,
            // Forwarded host headers are not trusted for the visible URI
            HTTP_HOST => self
                .req
                .headers()
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
                .or_else(|| self.req.uri().authority().map(|a| a.to_string())),
            REMOTE_ADDR => self.req.peer_addr().map(|addr| addr.ip().to_string()),
            _ => None,
        }
    }
}

/// Resolve the site URI and client address of a request
pub fn resolve_request_identity(
    req: &HttpRequest,
    config: &AppConfig,
    ip_detector: &IpAddressDetector,
) -> Result<RequestIdentity, IdentityError> {
    let environment = RequestEnvironment::new(req, &config.script_name);
    let factory = SiteUriFactory::new(config.clone(), &environment);
    let site_uri = factory.create_from_environment()?;

    let remote_addr = environment.remote_addr().unwrap_or_default();
    let client_ip = ip_detector.detect_resolved(&remote_addr, |name| {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    });

    Ok(RequestIdentity {
        site_uri,
        client_ip,
        detection_method: config.uri_protocol,
    })
}

/// Extract the client IP address of a request
///
/// Uses the address resolved by the identity middleware. Without one, the
/// peer address is returned; forwarding headers are never read here.
pub fn extract_client_ip(req: &HttpRequest) -> String {
    if let Some(identity) = req.extensions().get::<RequestIdentity>() {
        return identity.client_ip().to_string();
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNSPECIFIED_ADDRESS.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

//! Client IP resolution behind trusted proxies.
//!
//! A forwarding header is only ever honored when the immediate peer matches a
//! configured proxy entry. Every value that reaches the caller is a
//! syntactically valid IP literal; malformed input falls back to the peer
//! address, or to the unspecified address when the peer itself is malformed.

use crate::{
    config::{ProxyMatcher, ProxyTable},
    models::{ConfigError, ResolvedClientIp},
};
use serde_json::Value;
use std::net::IpAddr;

/// Returned when the peer address is not a valid IP literal
pub const UNSPECIFIED_ADDRESS: &str = "0.0.0.0";

impl ProxyMatcher {
    /// Whether `addr` is this exact address or falls inside this block.
    /// Addresses of different families never match.
    pub fn matches(&self, addr: &IpAddr) -> bool {
        match self {
            ProxyMatcher::Address(address) => address == addr,
            ProxyMatcher::Subnet(network) => network.contains(addr),
        }
    }
}

/// Resolves the real client address from the peer and its headers
#[derive(Clone, Debug, Default)]
pub struct IpAddressDetector {
    proxies: ProxyTable,
}

impl IpAddressDetector {
    pub fn new(proxies: ProxyTable) -> Self {
        Self { proxies }
    }

    /// Build a detector from a raw configuration value; only a mapping of
    /// address or subnet to header name is accepted
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        ProxyTable::from_json(value).map(Self::new)
    }

    pub fn proxies(&self) -> &ProxyTable {
        &self.proxies
    }

    /// Resolve the client address as a plain string
    pub fn detect<F>(&self, remote_addr: &str, header_lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        self.detect_resolved(remote_addr, header_lookup).into_ip()
    }

    /// Resolve the client address, keeping track of where it came from
    pub fn detect_resolved<F>(&self, remote_addr: &str, header_lookup: F) -> ResolvedClientIp
    where
        F: Fn(&str) -> Option<String>,
    {
        let Ok(peer) = remote_addr.parse::<IpAddr>() else {
            tracing::debug!(
                remote_addr = ?remote_addr,
                "Peer address is not a valid IP literal"
            );
            return ResolvedClientIp::Unspecified;
        };

        let Some(entry) = self
            .proxies
            .entries()
            .iter()
            .find(|entry| entry.matcher.matches(&peer))
        else {
            return ResolvedClientIp::Peer(remote_addr.to_string());
        };

        let Some(header_value) = header_lookup(&entry.header) else {
            return ResolvedClientIp::Peer(remote_addr.to_string());
        };

        let candidate = header_value.split(',').next().unwrap_or_default().trim();

        if candidate.parse::<IpAddr>().is_err() {
            tracing::warn!(
                peer = %remote_addr,
                header = %entry.header,
                forwarded = ?candidate,
                "Ignoring malformed forwarded address from trusted proxy"
            );
            return ResolvedClientIp::Peer(remote_addr.to_string());
        }

        tracing::debug!(
            peer = %remote_addr,
            header = %entry.header,
            client_ip = %candidate,
            "Resolved client address from trusted proxy"
        );

        ResolvedClientIp::Forwarded {
            ip: candidate.to_string(),
            header: entry.header.clone(),
        }
    }
}

/// Resolve a client address against a proxy table in one call
pub fn detect_client_ip<F>(remote_addr: &str, proxies: &ProxyTable, header_lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    IpAddressDetector::new(proxies.clone()).detect(remote_addr, header_lookup)
}

//! Trusted proxy configuration.
//!
//! Each entry maps a proxy address or subnet to the header that carries the
//! real client address when that proxy is the immediate peer. Entries keep
//! their configuration order; the first matching entry wins.

use crate::models::ConfigError;
use serde_json::Value;
use ipnet::IpNet;
use std::{env, net::IpAddr, str::FromStr};

/// Which peers an entry trusts
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProxyMatcher {
    /// A single address literal
    Address(IpAddr),
    /// A CIDR block, kept as configured
    Subnet(IpNet),
}

impl ProxyMatcher {
    /// Parse an address literal or `address/prefix` block
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let invalid = || ConfigError::InvalidProxyAddress(raw.to_string());

        if raw.contains('/') {
            IpNet::from_str(raw).map(ProxyMatcher::Subnet).map_err(|_| invalid())
        } else {
            raw.parse().map(ProxyMatcher::Address).map_err(|_| invalid())
        }
    }
}

/// One trusted proxy and the header it is authoritative for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyTrustEntry {
    pub matcher: ProxyMatcher,
    pub header: String,
}

/// Ordered table of trusted proxies
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyTable {
    entries: Vec<ProxyTrustEntry>,
}

impl ProxyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(address-or-subnet, header)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = Vec::new();

        for (address, header) in pairs {
            let header = header.as_ref().trim();
            if header.is_empty() {
                return Err(ConfigError::InvalidProxyTable(format!(
                    "missing header name for {}",
                    address.as_ref()
                )));
            }
            entries.push(ProxyTrustEntry {
                matcher: ProxyMatcher::parse(address.as_ref())?,
                header: header.to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// Build a table from a JSON value. Only an object is a valid table.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (address, header) in map {
                    let header = header.as_str().ok_or_else(|| {
                        ConfigError::InvalidProxyTable(format!("header for {address} must be a string"))
                    })?;
                    pairs.push((address.as_str(), header));
                }
                Self::from_pairs(pairs)
            }
            Value::Array(items) if items.is_empty() => Ok(Self::new()),
            other => Err(ConfigError::InvalidProxyTable(other.to_string())),
        }
    }

    /// Parse the textual configuration form.
    ///
    /// Accepts a JSON object or a comma separated list of `address=Header`
    /// pairs. A plain address list is rejected.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Ok(Self::new());
        }

        if raw.starts_with('{') || raw.starts_with('[') {
            let value: Value = serde_json::from_str(raw)
                .map_err(|e| ConfigError::InvalidProxyTable(format!("{raw}: {e}")))?;
            return Self::from_json(&value);
        }

        let mut pairs = Vec::new();
        for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let (address, header) = item
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidProxyTable(raw.to_string()))?;
            pairs.push((address.trim(), header.trim()));
        }

        Self::from_pairs(pairs)
    }

    /// Load the table from `APP_PROXY_IPS`. A missing variable means no proxies.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var("APP_PROXY_IPS") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Ok(Self::new()),
        }
    }

    pub fn entries(&self) -> &[ProxyTrustEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

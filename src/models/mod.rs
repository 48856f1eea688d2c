//! Data models for request identity resolution.
//!
//! This module contains the URI value types, the captured environment
//! signals, the error taxonomy and the API response models.

pub mod api;
pub mod environment;
pub mod error;
pub mod identity;
pub mod site_uri;
pub mod uri;

pub use api::*;
pub use environment::{EnvironmentSnapshot, RawEnvironmentSignals};
pub use error::*;
pub use identity::*;
pub use site_uri::SiteUri;
pub use uri::{Uri, remove_dot_segments};

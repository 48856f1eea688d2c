//! Custom middleware implementations for the API.
//!
//! This module contains middleware for request identity resolution, request
//! IDs and metrics collection.

pub mod identity;
pub mod metrics;
pub mod request_id;

pub use identity::*;
pub use metrics::*;
pub use request_id::*;

//! Utility functions and helper modules.
//!
//! This module contains the actix adapter for environment signals and helpers
//! that read the resolved identity back from a request.

pub mod http;
pub mod route;

pub use http::*;
pub use route::*;

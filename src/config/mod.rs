//! Configuration structures and loading utilities.
//!
//! This module contains all configuration structures used by the application,
//! including environment variable loading and default values.

pub mod app;
pub mod metrics;
pub mod proxy;

pub use app::*;
pub use metrics::*;
pub use proxy::*;

//! Metrics configuration.

use std::env;

/// Configuration for application metrics collection
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetricsConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let enabled = env::var("METRICS_ENABLED")
            .map(|v| v.trim().to_lowercase() != "false")
            .unwrap_or(true);

        Self { enabled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_metrics_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        unsafe {
            env::remove_var("METRICS_ENABLED");
        }
        assert!(MetricsConfig::from_env().enabled);

        unsafe {
            env::set_var("METRICS_ENABLED", "False");
        }
        assert!(!MetricsConfig::from_env().enabled);

        unsafe {
            env::remove_var("METRICS_ENABLED");
        }
    }
}

//! Application-level configuration shared by the workspace binaries

use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (dev, prod, etc.)
    pub environment: String,
    /// Default log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "pe-value".to_string(),
            environment: "development".to_string(),
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Apply `APP_ENV`, `LOG_LEVEL` and `LOG_FORMAT` from the environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("APP_ENV").ok(),
            std::env::var("LOG_LEVEL").ok(),
            std::env::var("LOG_FORMAT").ok(),
        )
    }

    /// Production deployments log JSON unless a format is given explicitly
    fn with_overrides(
        mut self,
        environment: Option<String>,
        log_filter: Option<String>,
        log_format: Option<String>,
    ) -> Self {
        if let Some(env) = environment {
            self.environment = env;
        }
        if let Some(level) = log_filter {
            self.log_filter = level;
        }
        match log_format {
            Some(format) => self.log_format = LogFormat::parse(&format),
            None if self.is_production() => self.log_format = LogFormat::Json,
            None => {}
        }
        self
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
            || self.environment.eq_ignore_ascii_case("prod")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app_name, "pe-value");
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_detection() {
        let config = Config {
            environment: "Prod".to_string(),
            ..Default::default()
        };
        assert!(config.is_production());
    }

    #[test]
    fn test_production_logs_json_by_default() {
        let config = Config::default().with_overrides(Some("production".to_string()), None, None);
        assert_eq!(config.log_format, LogFormat::Json);

        let config = Config::default().with_overrides(
            Some("prod".to_string()),
            Some("debug".to_string()),
            Some("pretty".to_string()),
        );
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_filter, "debug");

        let config = Config::default().with_overrides(Some("staging".to_string()), None, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}

//! Configuration loading.

use thiserror::Error;

use super::schema::ShieldConfig;
use super::validation::{validate, ValidationError};

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration ({} problem(s))", .0.len())]
    Invalid(Vec<ValidationError>),

    #[error("failed to load threat catalog: {0}")]
    Catalog(#[from] crate::detector::CatalogError),
}

/// Load and validate a TOML configuration file.
///
/// Every validation problem is logged individually before the summary
/// error is returned.
pub fn load_from_file(path: &str) -> Result<ShieldConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    let config: ShieldConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;

    if let Err(errors) = validate(&config) {
        for error in &errors {
            tracing::error!(%error, "Invalid configuration value");
        }
        return Err(ConfigError::Invalid(errors));
    }

    tracing::info!(path, "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: ShieldConfig = toml::from_str("").unwrap();
        assert_eq!(config.rate_limit.max_requests, 100);
        assert!(config.zero_trust.strict_mode);
    }

    #[test]
    fn sections_override_defaults() {
        let doc = r#"
            [rate_limit]
            max_requests = 5
            window_ms = 1000

            [zero_trust]
            strict_mode = false
            denied_networks = ["203.0.113."]
        "#;
        let config: ShieldConfig = toml::from_str(doc).unwrap();
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_ms, 1000);
        assert!(!config.zero_trust.strict_mode);
        assert_eq!(config.zero_trust.denied_networks.len(), 1);
        // Untouched sections keep their defaults.
        assert_eq!(config.monitor.max_events, 1000);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! Environment-driven server configuration.

use std::path::PathBuf;

use terra_insight_model::NormalizationMode;
use thiserror::Error;

/// Default interface to bind.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default directory of the persisted model pair.
pub const DEFAULT_MODEL_PATH: &str = "./trained_models";

/// Frontend origins allowed by default.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5000"];

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable held a value that could not be parsed.
    #[error("Invalid value '{value}' for {name}: {message}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        message: String,
    },
}

/// Runtime settings for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Directory holding the persisted model pair; also where training
    /// jobs write new artifacts.
    pub model_path: PathBuf,
    pub normalization: NormalizationMode,
    /// Allowed CORS origins; `*` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            normalization: NormalizationMode::default(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `MODEL_PATH`, `NORMALIZATION_MODE` and
    /// `CORS_ORIGINS` (comma separated), falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `PORT` or
    /// `NORMALIZATION_MODE` is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(bind_addr) = lookup("BIND_ADDR") {
            config.bind_addr = bind_addr;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                name: "PORT",
                value: port.clone(),
                message: e.to_string(),
            })?;
        }
        if let Some(model_path) = lookup("MODEL_PATH") {
            config.model_path = PathBuf::from(model_path);
        }
        if let Some(mode) = lookup("NORMALIZATION_MODE") {
            config.normalization = mode
                .parse::<NormalizationMode>()
                .map_err(|e| ConfigError::InvalidValue {
                    name: "NORMALIZATION_MODE",
                    value: mode.clone(),
                    message: format!("{e}, expected one of trained, per_request_refit"),
                })?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(ToString::to_string)
                .collect();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 8000);
        assert_eq!(config.normalization, NormalizationMode::Trained);
    }

    #[test]
    fn reads_every_variable() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "9100"),
            ("MODEL_PATH", "/srv/models"),
            ("NORMALIZATION_MODE", "per_request_refit"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 9100);
        assert_eq!(config.model_path, PathBuf::from("/srv/models"));
        assert_eq!(config.normalization, NormalizationMode::PerRequestRefit);
        assert_eq!(
            config.cors_origins,
            ["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"), "{err}");
    }

    #[test]
    fn invalid_normalization_mode_is_rejected() {
        let err =
            ServerConfig::from_lookup(lookup(&[("NORMALIZATION_MODE", "fresh")])).unwrap_err();
        assert!(err.to_string().contains("NORMALIZATION_MODE"), "{err}");
        assert!(err.to_string().contains("per_request_refit"), "{err}");
    }
}

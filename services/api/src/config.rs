//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origin: String,
    pub session_ttl_days: i64,
    pub openai_api_key: Option<String>,
    pub use_ai_questions: bool,
    pub ai_model_name: String,
    pub ocr_model: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upload and Auth Settings ---
        let upload_dir = PathBuf::from(var_or("UPLOAD_DIR", "./uploads"));
        let max_upload_bytes = parse_number("MAX_UPLOAD_BYTES", &var_or("MAX_UPLOAD_BYTES", "10485760"))?;
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");
        let session_ttl_days = parse_number("SESSION_TTL_DAYS", &var_or("SESSION_TTL_DAYS", "30"))?;

        // --- Load Question Generation Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let use_ai_questions = parse_bool("USE_AI_QUESTIONS", &var_or("USE_AI_QUESTIONS", "false"))?;
        let ai_model_name = var_or("AI_MODEL_NAME", "gpt-4o-mini");
        let ocr_model = var_or("OCR_MODEL", "gpt-4o-mini");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            upload_dir,
            max_upload_bytes,
            cors_origin,
            session_ttl_days,
            openai_api_key,
            use_ai_questions,
            ai_model_name,
            ocr_model,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("'{}' is not a valid number", value))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a valid boolean", value),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/prep")]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.session_ttl_days, 30);
        assert!(!config.use_ai_questions);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.ai_model_name, "gpt-4o-mini");
    }

    #[test]
    fn database_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "DATABASE_URL"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[("DATABASE_URL", "x"), ("USE_AI_QUESTIONS", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "USE_AI_QUESTIONS"));

        let err = load(&[("DATABASE_URL", "x"), ("MAX_UPLOAD_BYTES", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "MAX_UPLOAD_BYTES"));
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let config = load(&[
            ("DATABASE_URL", "x"),
            ("OPENAI_API_KEY", "  "),
            ("USE_AI_QUESTIONS", "TRUE"),
        ])
        .unwrap();
        assert!(config.openai_api_key.is_none());
        assert!(config.use_ai_questions);
    }
}

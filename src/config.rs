//! Configuration module

use std::env;

/// Fixed relative filename of the model artifact, resolved at startup
pub const MODEL_PATH: &str = "model_regresi_padi.json";

/// Frontend origin allowed by default
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Surface load diagnostics in error responses
    pub debug: bool,

    /// Origins allowed to read cross-origin responses
    pub cors_allowed_origins: Vec<String>,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            debug: false,
            cors_allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),

            debug: lookup("DEBUG")
                .map(|d| parse_flag(&d))
                .unwrap_or(defaults.debug),

            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|o| parse_origins(&o))
                .filter(|o| !o.is_empty())
                .unwrap_or(defaults.cors_allowed_origins),

            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => defaults.log_format,
            },
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

use thiserror::Error;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set (export it or add it to .env)")]
    MissingApiKey,
}

/// Runtime configuration for tattoo-server.
///
/// Only `GEMINI_API_KEY` is mandatory; every other field has a default.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// Gemini API key. Required.
    pub gemini_api_key: String,

    /// Override for the Gemini API host.
    pub gemini_api_base: Option<String>,

    /// Where generated PNGs are kept (default: `"generated images"`).
    pub output_dir: PathBuf,

    /// Directory served under `/static` (default: `"static"`).
    pub static_dir: PathBuf,

    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_api_base", &self.gemini_api_base)
            .field("output_dir", &self.output_dir)
            .field("static_dir", &self.static_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Config {
    /// Build [`Config`] from the process environment.
    ///
    /// Fails when the API key is missing so the server never starts without
    /// a usable model client.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            bind_address: env_or(&lookup, "TATTOO_BIND", "0.0.0.0:8000"),
            gemini_api_key,
            gemini_api_base: lookup("GEMINI_API_BASE").filter(|v| !v.is_empty()),
            output_dir: env_or(&lookup, "TATTOO_OUTPUT_DIR", "generated images").into(),
            static_dir: env_or(&lookup, "TATTOO_STATIC_DIR", "static").into(),
            max_upload_bytes: parse_env(&lookup, "TATTOO_MAX_UPLOAD_MB", 20usize) * MIB,
            cors_allowed_origins: lookup("TATTOO_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
            log_level: env_or(&lookup, "TATTOO_LOG", "info"),
            log_json: lookup("TATTOO_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

//! Configuration for the Promptly API.
//!
//! Loads an optional JSON config file, then applies environment variable
//! overrides. Two identity-provider credentials are mandatory; the process
//! refuses to start without them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".promptly"),
        |dirs| dirs.home_dir().join(".promptly"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default is `127.0.0.1` (local only).
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Identity-provider credentials used to validate bearer sessions.
///
/// Both keys are required at startup; `Config::validate` rejects a
/// configuration where either is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Publishable (client-side) key of the identity provider.
    #[serde(default)]
    pub publishable_key: Option<String>,

    /// Secret key of the identity provider. Also used to verify the
    /// HS256 session tokens presented by clients.
    #[serde(default)]
    pub secret_key: Option<String>,
}

/// AI provider selection and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Which implementation to use: `"openai"` for the provider-backed
    /// service, anything else selects the deterministic mock.
    #[serde(default = "default_ai_provider")]
    pub provider: String,

    /// OpenAI API key (required only when provider is `"openai"`).
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Chat-completion model to request.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            openai_api_key: None,
            model: default_model(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path. Defaults to `<config dir>/promptly.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Resolve the database path, falling back to the default location.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| config_dir().join("promptly.db"))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Root configuration for the Promptly API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path with env overrides.
    pub fn load() -> Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            tracing::info!("Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path (no env overrides).
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }

        if let Ok(key) = std::env::var("CLERK_PUBLISHABLE_KEY") {
            self.auth.publishable_key = Some(key);
        }
        if let Ok(key) = std::env::var("CLERK_SECRET_KEY") {
            self.auth.secret_key = Some(key);
        }

        if let Ok(provider) = std::env::var("AI_SERVICE_PROVIDER") {
            self.ai.provider = provider;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(key);
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Validate that mandatory settings are present.
    ///
    /// The identity-provider keys have no usable default; startup must
    /// fail when either is missing or empty.
    pub fn validate(&self) -> crate::error::Result<()> {
        match &self.auth.publishable_key {
            Some(key) if !key.is_empty() => {}
            _ => {
                return Err(crate::error::Error::config(
                    "Missing required environment variable: CLERK_PUBLISHABLE_KEY",
                ))
            }
        }
        match &self.auth.secret_key {
            Some(key) if !key.is_empty() => {}
            _ => {
                return Err(crate::error::Error::config(
                    "Missing required environment variable: CLERK_SECRET_KEY",
                ))
            }
        }
        Ok(())
    }

    /// Get the configured identity-provider secret key.
    ///
    /// Only call after `validate` has passed.
    pub fn auth_secret(&self) -> &str {
        self.auth.secret_key.as_deref().unwrap_or_default()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_ai_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

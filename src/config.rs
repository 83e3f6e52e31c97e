//! Configuration module for qrdrop.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::file::NamingPolicy;
use crate::{Result, ShareError};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Absolute base URL used in links (e.g. "https://drop.example.com").
    ///
    /// When unset, links are built from the request's Host header.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Allowed CORS origins (empty means any origin, without credentials).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Serve the browser front end from `static_path`.
    #[serde(default)]
    pub serve_static: bool,
    /// Directory holding the browser front end.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_path() -> String {
    "public".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
            cors_origins: Vec::new(),
            serve_static: false,
            static_path: default_static_path(),
        }
    }
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding stored uploads.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// How storage keys are derived from uploaded filenames.
    #[serde(default)]
    pub naming: NamingPolicy,
    /// Refuse to overwrite an existing key (the upload fails with a conflict).
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Leading characters of the original name kept verbatim in sanitized keys.
    #[serde(default)]
    pub raw_prefix_len: usize,
}

fn default_storage_path() -> String {
    "uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

fn default_strict() -> bool {
    true
}

impl StorageConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
            naming: NamingPolicy::default(),
            strict: default_strict(),
            raw_prefix_len: 0,
        }
    }
}

/// Preview rendering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// Online document viewer; the percent-encoded file URL is appended.
    #[serde(default = "default_office_viewer_url")]
    pub office_viewer_url: String,
    /// Extra extension to MIME type entries, merged over the built-in table.
    #[serde(default)]
    pub mime_types: HashMap<String, String>,
    /// Text files larger than this (in KB) are served raw instead of wrapped
    /// in a preview page.
    #[serde(default = "default_max_text_kb")]
    pub max_text_kb: u64,
}

impl PreviewConfig {
    /// Text preview size limit in bytes.
    pub fn max_text_bytes(&self) -> u64 {
        self.max_text_kb * 1024
    }
}

fn default_max_text_kb() -> u64 {
    1024
}

fn default_office_viewer_url() -> String {
    "https://view.officeapps.live.com/op/embed.aspx?src=".to_string()
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            office_viewer_url: default_office_viewer_url(),
            mime_types: HashMap::new(),
            max_text_kb: default_max_text_kb(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/qrdrop.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Preview configuration.
    #[serde(default)]
    pub preview: PreviewConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `QRDROP_HOST`: listen address
    /// - `QRDROP_PORT`: listen port
    /// - `QRDROP_STORAGE_PATH`: upload directory
    /// - `QRDROP_PUBLIC_URL`: base URL used in links
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(host) = var("QRDROP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("QRDROP_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ShareError::Config(format!("invalid QRDROP_PORT: {port}")))?;
        }
        if let Some(path) = var("QRDROP_STORAGE_PATH") {
            self.storage.path = path;
        }
        if let Some(url) = var("QRDROP_PUBLIC_URL") {
            self.server.public_url = Some(url);
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the upload limit is zero
    /// - `public_url` is set but is not an http(s) URL
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_upload_size_mb == 0 {
            return Err(ShareError::Config(
                "storage.max_upload_size_mb must be greater than 0".to_string(),
            ));
        }
        if let Some(url) = &self.server.public_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ShareError::Config(format!(
                    "server.public_url must start with http:// or https://, got {url}"
                )));
            }
        }
        Ok(())
    }
}

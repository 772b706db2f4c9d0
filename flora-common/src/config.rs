//! Bootstrap configuration loading
//!
//! Settings are read once at startup and never change while running.
//! Priority order for each setting (applied by the service):
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: it is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default request body limit for `POST /identify` (20 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Default chat-completions endpoint of the remote provider
pub const DEFAULT_CLOUD_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Bind address
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Directory holding `flower_names.json` and `classes.json`
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Classifier model artifact
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Line-oriented credential file for the remote provider
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,

    /// Inline credential for the remote provider
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request body limit in bytes
    #[serde(default)]
    pub max_image_bytes: Option<usize>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote provider settings (optional)
    #[serde(default)]
    pub cloud: CloudConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Remote vision/text provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudConfig {
    /// Chat-completions endpoint
    #[serde(default = "default_cloud_base_url")]
    pub base_url: String,

    /// Model used for image identification
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Model used for text generation
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: default_cloud_base_url(),
            vision_model: default_vision_model(),
            text_model: default_text_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cloud_base_url() -> String {
    DEFAULT_CLOUD_BASE_URL.to_string()
}

fn default_vision_model() -> String {
    "glm-4v".to_string()
}

fn default_text_model() -> String {
    "glm-4".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub max_image_bytes: usize,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// OS-dependent default data directory
///
/// - Linux: `~/.local/share/flora`
/// - macOS: `~/Library/Application Support/flora`
/// - Windows: `%LOCALAPPDATA%\flora`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("flora"))
        .unwrap_or_else(|| PathBuf::from("./flora_data"))
}

/// Default location of the service's TOML file (`<config dir>/flora/<module>.toml`)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flora").join(format!("{}.toml", module_name)))
}

/// Parse a TOML config file
///
/// Returns an error if the file can't be read or parsed. Use
/// [`load_toml_config_or_default`] at startup.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load a TOML config file, falling back to defaults
///
/// A missing file is logged at info level, a broken one at warn level. Neither
/// stops startup.
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        info!("No config file location available, using defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        info!("Config file {} not found, using defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

//! Configuration resolution for flora-id
//!
//! Every setting resolves with CLI → ENV → TOML → compiled default priority.
//! CLI flags and environment variables are merged by clap (a flag beats its
//! `FLORA_*` variable); TOML and defaults are applied here.
//!
//! The remote provider credential resolves ENV → TOML → credential file.
//! Nothing here is fatal: a missing credential only disables the remote
//! provider.

use clap::Parser;
use flora_common::config::{
    default_config_path, load_toml_config_or_default, CloudConfig, CompiledDefaults, TomlConfig,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the remote provider credential
pub const API_KEY_ENV: &str = "FLORA_API_KEY";

/// Command-line arguments (each also readable from the environment)
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "flora-id", version, about = "Flower identification service")]
pub struct Cli {
    /// TOML config file
    #[arg(long, env = "FLORA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bind address
    #[arg(long, env = "FLORA_HOST")]
    pub host: Option<String>,

    /// HTTP port
    #[arg(long, env = "FLORA_PORT")]
    pub port: Option<u16>,

    /// Directory holding flower_names.json and classes.json
    #[arg(long, env = "FLORA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Classifier model artifact
    #[arg(long, env = "FLORA_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Credential file for the remote provider
    #[arg(long, env = "FLORA_API_KEY_FILE")]
    pub api_key_file: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "FLORA_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub api_key_file: PathBuf,
    pub max_image_bytes: usize,
    pub log_level: String,
    pub cloud: CloudConfig,
}

impl ServiceConfig {
    /// Load the TOML file named by the CLI (or the default location) and resolve
    pub fn load(cli: &Cli) -> (Self, TomlConfig) {
        let path = cli
            .config
            .clone()
            .or_else(|| default_config_path("flora-id"));
        let toml_config = load_toml_config_or_default(path.as_deref());
        (Self::resolve(cli, &toml_config), toml_config)
    }

    /// Apply CLI/ENV → TOML → default priority
    pub fn resolve(cli: &Cli, toml_config: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| toml_config.data_dir.clone())
            .unwrap_or(defaults.data_dir);

        let model_path = cli
            .model_path
            .clone()
            .or_else(|| toml_config.model_path.clone())
            .unwrap_or_else(|| data_dir.join("model").join("best_model.onnx"));

        let api_key_file = cli
            .api_key_file
            .clone()
            .or_else(|| toml_config.api_key_file.clone())
            .unwrap_or_else(|| data_dir.join("apikey.txt"));

        Self {
            host: cli
                .host
                .clone()
                .or_else(|| toml_config.host.clone())
                .unwrap_or(defaults.host),
            port: cli.port.or(toml_config.port).unwrap_or(defaults.port),
            data_dir,
            model_path,
            api_key_file,
            max_image_bytes: toml_config
                .max_image_bytes
                .unwrap_or(defaults.max_image_bytes),
            log_level: cli
                .log_level
                .clone()
                .unwrap_or_else(|| toml_config.logging.level.clone()),
            cloud: toml_config.cloud.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log filter directive: `RUST_LOG` when it parses, else `level`, else `info`
pub fn log_filter_directive(rust_log: Option<&str>, level: &str) -> String {
    [rust_log, Some(level)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|d| !d.is_empty() && EnvFilter::try_new(d).is_ok())
        .unwrap_or("info")
        .to_string()
}

/// Resolve the remote provider credential
///
/// **Priority:** ENV → TOML → credential file. Returns `None` when no
/// source yields a valid key.
pub fn resolve_api_key(toml_config: &TomlConfig, key_file: &Path) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.api_key.clone().filter(|k| is_valid_key(k));
    let file_key = read_api_key_file(key_file);

    let sources: Vec<&str> = [
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
        file_key.as_ref().map(|_| "credential file"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match (env_key, toml_key, file_key) {
        (Some(key), _, _) => {
            info!("API key loaded from environment variable");
            Some(key.trim().to_string())
        }
        (None, Some(key), _) => {
            info!("API key loaded from TOML config");
            Some(key.trim().to_string())
        }
        (None, None, Some(key)) => {
            info!("API key loaded from {}", key_file.display());
            Some(key)
        }
        (None, None, None) => {
            warn!(
                "No API key configured (set {}, `api_key` in TOML, or {}); remote provider disabled",
                API_KEY_ENV,
                key_file.display()
            );
            None
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn read_api_key_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_api_key_file(&content),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Credential file not readable");
            None
        }
    }
}

/// Extract the provider key from the line-oriented credential file
///
/// The first line mentioning the provider (`智谱` or `zhipu`, any case) is
/// split on `:` (full-width `：` too); the second part, trimmed, is the key.
pub fn parse_api_key_file(content: &str) -> Option<String> {
    let line = content
        .lines()
        .find(|line| line.contains("智谱") || line.to_lowercase().contains("zhipu"))?;

    let normalized = line.replace('：', ":");
    let key = normalized.split(':').nth(1)?.trim();

    is_valid_key(key).then(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_key_file_ascii_colon() {
        let content = "openai: sk-xxx\nzhipu: abc.123\n";
        assert_eq!(parse_api_key_file(content), Some("abc.123".to_string()));
    }

    #[test]
    fn test_parse_api_key_file_full_width_colon() {
        let content = "智谱：  key-with-spaces  \n";
        assert_eq!(parse_api_key_file(content), Some("key-with-spaces".to_string()));
    }

    #[test]
    fn test_parse_api_key_file_case_insensitive() {
        assert_eq!(parse_api_key_file("ZhiPu API:k1"), Some("k1".to_string()));
    }

    #[test]
    fn test_parse_api_key_file_first_matching_line_wins() {
        let content = "zhipu: first\nzhipu: second";
        assert_eq!(parse_api_key_file(content), Some("first".to_string()));
    }

    #[test]
    fn test_parse_api_key_file_missing_or_blank() {
        assert_eq!(parse_api_key_file(""), None);
        assert_eq!(parse_api_key_file("openai: sk-xxx"), None);
        assert_eq!(parse_api_key_file("zhipu"), None);
        assert_eq!(parse_api_key_file("zhipu:   "), None);
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("  \t"));
    }

    #[test]
    fn test_log_filter_directive_priority() {
        assert_eq!(log_filter_directive(Some("flora_id=trace"), "warn"), "flora_id=trace");
        assert_eq!(log_filter_directive(None, "debug"), "debug");
        assert_eq!(log_filter_directive(Some("  "), "debug"), "debug");
        assert_eq!(log_filter_directive(Some("flora_id=loud"), "warn"), "warn");
        assert_eq!(log_filter_directive(None, "flora_id=loud"), "info");
        assert_eq!(log_filter_directive(None, ""), "info");
    }

    #[test]
    fn test_resolve_uses_defaults() {
        let config = ServiceConfig::resolve(&Cli::default(), &TomlConfig::default());

        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.log_level, "info");
        assert!(config.model_path.starts_with(&config.data_dir));
        assert!(config.model_path.ends_with("model/best_model.onnx"));
        assert!(config.api_key_file.ends_with("apikey.txt"));
    }

    #[test]
    fn test_cli_overrides_toml() {
        let cli = Cli {
            port: Some(9100),
            data_dir: Some(PathBuf::from("/cli/data")),
            ..Cli::default()
        };
        let toml_config = TomlConfig {
            port: Some(9000),
            host: Some("127.0.0.1".to_string()),
            data_dir: Some(PathBuf::from("/toml/data")),
            ..TomlConfig::default()
        };

        let config = ServiceConfig::resolve(&cli, &toml_config);

        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.data_dir, PathBuf::from("/cli/data"));
        assert_eq!(
            config.model_path,
            PathBuf::from("/cli/data/model/best_model.onnx")
        );
        assert_eq!(config.bind_address(), "127.0.0.1:9100");
    }
}

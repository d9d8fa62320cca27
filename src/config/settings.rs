//! TOML-based configuration for sqlmend.
//!
//! Supports a config file (sqlmend.toml) with environment variable
//! expansion in the generator command line.
//!
//! Example configuration:
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5003
//!
//! [generator]
//! command = "python3"
//! args = ["${SQLMEND_HOME}/generate_worker.py"]
//! timeout_secs = 30
//!
//! [pipeline]
//! default_schema = "users(name, email), orders(id, user_id)"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Schema used when a request does not supply one.
pub const SAMPLE_SCHEMA: &str = "users(name, email, created_at, is_active), orders(id, user_id, order_date, total_amount), products(id, name, price, stock)";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub generator: GeneratorSettings,
    pub pipeline: PipelineSettings,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5003,
        }
    }
}

impl ServerSettings {
    /// `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Generator worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Worker executable (supports ${ENV_VAR} expansion). None disables
    /// generation.
    pub command: Option<String>,

    /// Worker arguments (supports ${ENV_VAR} expansion).
    pub args: Vec<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// Pipeline defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Schema used when a request omits one.
    pub default_schema: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_schema: SAMPLE_SCHEMA.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SQLMEND_CONFIG`
    /// 2. `./sqlmend.toml`
    /// 3. `~/.config/sqlmend/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SQLMEND_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sqlmend.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sqlmend").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        let path = env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("${PATH}").unwrap(), path);
        assert_eq!(expand_env_vars("x:$PATH!").unwrap(), format!("x:{}!", path));
        assert_eq!(expand_env_vars("cost $ 5").unwrap(), "cost $ 5");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("${SQLMEND_NONEXISTENT_VAR_12345}");
        assert!(matches!(result, Err(SettingsError::MissingEnvVar(v)) if v == "SQLMEND_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[server]
port = 8080

[generator]
command = "python3"
args = ["worker.py", "--beams", "4"]
timeout_secs = 10

[pipeline]
default_schema = "Customers(id, name)"
"#;

        let settings: Settings = toml::from_str(toml).unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.address(), "0.0.0.0:8080");
        assert_eq!(settings.generator.command.as_deref(), Some("python3"));
        assert_eq!(settings.generator.args.len(), 3);
        assert_eq!(settings.generator.timeout_secs, 10);
        assert_eq!(settings.pipeline.default_schema, "Customers(id, name)");
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.server.port, 5003);
        assert!(settings.generator.command.is_none());
        assert_eq!(settings.generator.timeout_secs, 30);
        assert_eq!(settings.pipeline.default_schema, SAMPLE_SCHEMA);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Settings::from_file("/nonexistent/sqlmend.toml"),
            Err(SettingsError::FileNotFound(_))
        ));
    }
}

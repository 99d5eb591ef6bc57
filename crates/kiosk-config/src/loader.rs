//! Configuration loader.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// On-disk configuration format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.yaml`/`.yml` and `.toml` are recognised; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content, ConfigFormat::from_path(path))
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        if expanded.trim().is_empty() {
            return Ok(Config::default());
        }
        let config = match format {
            ConfigFormat::Yaml => serde_yml::from_str(&expanded)?,
            ConfigFormat::Toml => toml::from_str(&expanded)?,
            ConfigFormat::Json => serde_json::from_str(&expanded)?,
        };
        Ok(config)
    }

    /// Write configuration to a file in the format its extension selects.
    pub fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
        let content = Self::to_string(config, ConfigFormat::from_path(path))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Serialize configuration.
    pub fn to_string(config: &Config, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Yaml => Ok(serde_yml::to_string(config)?),
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
            ConfigFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        }
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static regex");

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/kiosk.yml`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

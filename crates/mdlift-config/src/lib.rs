use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variables that override file-based settings, for CI use.
pub const ENV_APP_ID: &str = "MDLIFT_APP_ID";
pub const ENV_APP_SECRET: &str = "MDLIFT_APP_SECRET";
pub const ENV_BASE_URL: &str = "MDLIFT_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://open.docsuite.io";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error(
        "Missing credentials: set app_id/app_secret in {0} or the {ENV_APP_ID}/{ENV_APP_SECRET} environment variables"
    )]
    MissingCredentials(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint base.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base for browser links to created documents; defaults to `base_url`.
    #[serde(default)]
    pub web_base_url: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    /// Folder token new documents are created under.
    #[serde(default)]
    pub default_folder: Option<String>,
    /// Base directory for relative image paths in pushed documents.
    #[serde(default)]
    pub image_base_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            web_base_url: None,
            app_id: None,
            app_secret: None,
            default_folder: None,
            image_base_dir: None,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded image base dir
        if let Some(dir) = &config.image_base_dir {
            config.image_base_dir = Some(Self::expand_path(dir).unwrap_or_else(|| dir.clone()));
        }

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load the config file (or defaults when absent) and apply environment
    /// overrides.
    pub fn resolve() -> Result<Self, ConfigError> {
        let mut config = Self::load()?.unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(app_id) = std::env::var(ENV_APP_ID)
            && !app_id.is_empty()
        {
            self.app_id = Some(app_id);
        }
        if let Ok(app_secret) = std::env::var(ENV_APP_SECRET)
            && !app_secret.is_empty()
        {
            self.app_secret = Some(app_secret);
        }
        if let Ok(base_url) = std::env::var(ENV_BASE_URL)
            && !base_url.is_empty()
        {
            self.base_url = base_url;
        }
    }

    /// The app credentials, or the error that tells the user where to put
    /// them.
    pub fn credentials(&self) -> Result<(String, String), ConfigError> {
        match (&self.app_id, &self.app_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok((id.clone(), secret.clone()))
            }
            _ => Err(ConfigError::MissingCredentials(Self::config_path())),
        }
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/mdlift");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// A starter config with placeholder credentials, for `mdlift init`.
    pub fn example() -> Self {
        Self {
            app_id: Some("your-app-id".to_string()),
            app_secret: Some("your-app-secret".to_string()),
            ..Self::default()
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/mdlift/config.toml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            app_id: Some("id".to_string()),
            app_secret: Some("secret".to_string()),
            image_base_dir: Some(PathBuf::from("/tmp/assets")),
            ..Config::default()
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original.app_id, deserialized.app_id);
        assert_eq!(original.base_url, deserialized.base_url);
        assert_eq!(original.image_base_dir, deserialized.image_base_dir);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        let test_config = Config {
            app_id: Some("abc".to_string()),
            default_folder: Some("folder-token".to_string()),
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();

        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config.app_id, test_config.app_id);
        assert_eq!(loaded_config.default_folder, test_config.default_folder);
    }

    #[test]
    fn test_missing_base_url_falls_back_to_default() {
        let config: Config = toml::from_str("app_id = \"x\"\n").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_image_base_dir_expands_tilde() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "image_base_dir = \"~/assets\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        let dir = config.image_base_dir.unwrap();

        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.to_string_lossy().ends_with("assets"));
    }

    #[test]
    fn test_credentials_missing_errors() {
        let config = Config::default();
        assert!(matches!(
            config.credentials(),
            Err(ConfigError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_credentials_present() {
        let config = Config {
            app_id: Some("id".to_string()),
            app_secret: Some("secret".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.credentials().unwrap(),
            ("id".to_string(), "secret".to_string())
        );
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        unsafe {
            env::set_var(ENV_APP_ID, "env-id");
            env::set_var(ENV_APP_SECRET, "env-secret");
        }

        let mut config = Config {
            app_id: Some("file-id".to_string()),
            app_secret: Some("file-secret".to_string()),
            ..Config::default()
        };
        config.apply_env_overrides();

        assert_eq!(config.app_id.as_deref(), Some("env-id"));
        assert_eq!(config.app_secret.as_deref(), Some("env-secret"));

        unsafe {
            env::remove_var(ENV_APP_ID);
            env::remove_var(ENV_APP_SECRET);
        }
    }
}

//! TOML configuration with multi-profile support
//!
//! The file lives at `~/.config/dataeng/config.toml` unless a directory is
//! given explicitly. Values missing from a profile fall back to environment
//! variables (see [`crate::utils::input`]).

use crate::error::ConfigError;
use crate::utils::input::EnvConfigReader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PROFILE_NAME: &str = "default";
const APP_DIR_NAME: &str = "dataeng";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_project: Option<String>,
    /// Service account key file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bigquery_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mssql_connection_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Profile {
    /// Fill unset values from the environment
    pub fn with_env_fallbacks(mut self) -> Self {
        self.gcp_project = self.gcp_project.or_else(EnvConfigReader::read_gcp_project);
        self.gcp_credentials = self
            .gcp_credentials
            .or_else(EnvConfigReader::read_gcp_credentials);
        self.aws_region = self.aws_region.or_else(EnvConfigReader::read_aws_region);
        self.mysql_url = self.mysql_url.or_else(EnvConfigReader::read_mysql_url);
        self.mssql_connection_string = self
            .mssql_connection_string
            .or_else(EnvConfigReader::read_mssql_connection_string);
        self.log_level = self.log_level.or_else(EnvConfigReader::read_log_level);
        self
    }

    /// Overlay every value set in `other`
    pub fn merge(&mut self, other: Profile) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            gcp_project,
            gcp_credentials,
            aws_region,
            aws_profile,
            storage_endpoint,
            bigquery_endpoint,
            metadata_endpoint,
            mysql_url,
            mssql_connection_string,
            log_level
        );
    }
}

impl Config {
    /// Load from `config_dir/config.toml`, or the default location.
    /// A missing file yields the default configuration.
    pub fn load(config_dir: Option<&Path>) -> crate::Result<Self> {
        let config_path = Self::config_file_path(config_dir)?;

        if !config_path.exists() {
            log::debug!("No configuration at {}", config_path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: format!("{}: {}", config_path.display(), e),
        })?;

        Ok(config)
    }

    pub fn save(&self, config_dir: Option<&Path>) -> crate::Result<PathBuf> {
        let config_path = Self::config_file_path(config_dir)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::FileIo {
                path: parent.to_string_lossy().to_string(),
                source,
            })?;
        }

        let toml_content = toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;

        fs::write(&config_path, toml_content).map_err(|source| ConfigError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        Ok(config_path)
    }

    pub fn config_file_path(config_dir: Option<&Path>) -> crate::Result<PathBuf> {
        let dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::config_dir()
                .ok_or(ConfigError::ConfigDirNotFound)?
                .join(APP_DIR_NAME),
        };

        Ok(dir.join(CONFIG_FILE_NAME))
    }

    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Name of the profile to use: explicit, then `default_profile`, then `default`
    pub fn profile_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE_NAME)
    }

    /// The selected profile with environment fallbacks applied
    pub fn resolve_profile(&self, name: Option<&str>) -> Profile {
        self.get_profile(self.profile_name(name))
            .cloned()
            .unwrap_or_default()
            .with_env_fallbacks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_profile() -> Profile {
        Profile {
            gcp_project: Some("analytics-prod".to_string()),
            aws_region: Some("eu-west-1".to_string()),
            storage_endpoint: Some("http://localhost:4443".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_profile, None);
        assert_eq!(config.profiles.len(), 0);
    }

    #[test]
    fn test_profile_management() {
        let mut config = Config::default();
        config.set_profile("test".to_string(), sample_profile());

        let retrieved = config.get_profile("test");
        assert_eq!(retrieved, Some(&sample_profile()));
        assert!(config.get_profile("nonexistent").is_none());
    }

    #[test]
    fn test_profile_name_resolution() {
        let mut config = Config::default();
        assert_eq!(config.profile_name(None), "default");

        config.default_profile = Some("prod".to_string());
        assert_eq!(config.profile_name(None), "prod");
        assert_eq!(config.profile_name(Some("dev")), "dev");
    }

    #[test]
    fn test_config_load_save() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.default_profile = Some("test".to_string());
        config.set_profile("test".to_string(), sample_profile());

        let path = config
            .save(Some(temp_dir.path()))
            .expect("Failed to save config");
        assert_eq!(path, temp_dir.path().join("config.toml"));

        let loaded = Config::load(Some(temp_dir.path())).expect("Failed to load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = Config::load(Some(&temp_dir.path().join("missing")))
            .expect("Failed to load default config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("config.toml"), "profiles = [").expect("write failed");

        let result = Config::load(Some(temp_dir.path()));
        assert!(matches!(
            result,
            Err(crate::AppError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_profile_merge_overlays_set_values() {
        let mut profile = sample_profile();
        profile.merge(Profile {
            aws_region: Some("us-east-1".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        });

        assert_eq!(profile.aws_region.as_deref(), Some("us-east-1"));
        assert_eq!(profile.gcp_project.as_deref(), Some("analytics-prod"));
        assert_eq!(profile.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_resolve_unknown_profile_is_default() {
        let config = Config::default();
        let profile = config.resolve_profile(Some("missing"));
        assert!(profile.storage_endpoint.is_none());
    }
}

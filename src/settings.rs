use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;
use crate::schema::SchemaRevision;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const API_URL_ENV: &str = "INVOICE_FORM_API_URL";
pub const SCHEMA_ENV: &str = "INVOICE_FORM_SCHEMA";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub schema: SchemaRevision,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub clients_file: Option<String>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            schema: SchemaRevision::default(),
            timeout_secs: default_timeout_secs(),
            clients_file: None,
        }
    }
}

impl AppSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured clients file, or `clients.toml` in the platform data dir.
    pub fn clients_path(&self) -> PathBuf {
        match &self.clients_file {
            Some(path) => PathBuf::from(expand_home_dir(path)),
            None => ProjectDirs::from("com", "invoice-form", "app")
                .map(|dirs| dirs.data_dir().join("clients.toml"))
                .unwrap_or_else(|| PathBuf::from("clients.toml")),
        }
    }

    /// A zero timeout would fail every request before it is sent.
    pub fn check(&self, path: &Path) -> Result<(), SettingsError> {
        if self.timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                path: path.to_path_buf(),
                message: "timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Applies environment overrides given as (name, value) pairs.
    pub fn apply_env<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            match key.as_ref() {
                API_URL_ENV if !value.as_ref().trim().is_empty() => {
                    self.api_base_url = value.as_ref().trim().to_string();
                }
                SCHEMA_ENV => {
                    if let Some(schema) = SchemaRevision::parse(value.as_ref()) {
                        self.schema = schema;
                    }
                }
                _ => {}
            }
        }
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "invoice-form", "app") {
        return proj_dirs.config_dir().join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

/// Reads `path` (defaults when missing), then the process environment.
pub fn load_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    let mut settings = read_settings_file(path)?;
    settings.apply_env(std::env::vars());
    settings.check(path)?;
    Ok(settings)
}

pub fn read_settings_file(path: &Path) -> Result<AppSettings, SettingsError> {
    if !path.exists() {
        debug!(?path, "no settings file, using defaults");
        return Ok(AppSettings::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })?;
    toml::from_str(&content)
        .map_err(|source| SettingsError::Parse { path: path.to_path_buf(), source })
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })?;
    }
    let toml_str = toml::to_string_pretty(settings)?;
    fs::write(path, toml_str)
        .map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;

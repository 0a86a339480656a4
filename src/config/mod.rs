//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::{StoredToken, TokenStore};

/// Environment overrides for `Settings`.
const ENV_CLIENT_ID: &str = "SECURE_DASHBOARD_CLIENT_ID";
const ENV_TENANT_ID: &str = "SECURE_DASHBOARD_TENANT_ID";
const ENV_API_URL: &str = "SECURE_DASHBOARD_API_URL";

/// Application settings (the `[settings]` table of config.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// App registration client ID (public client)
    #[serde(default)]
    pub client_id: String,
    /// Directory (tenant) ID, domain, or `common`/`organizations`
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    /// Protected API called from the Settings section
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Scopes requested at sign-in
    #[serde(default = "default_login_scopes")]
    pub login_scopes: Vec<String>,
    /// Scopes of the access token sent to the protected API
    #[serde(default = "default_api_scopes")]
    pub api_scopes: Vec<String>,
}

fn default_tenant_id() -> String {
    "common".to_string()
}

fn default_authority_host() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_api_url() -> String {
    "https://graph.microsoft.com/v1.0/me".to_string()
}

fn default_login_scopes() -> Vec<String> {
    vec!["openid".into(), "profile".into(), "email".into()]
}

fn default_api_scopes() -> Vec<String> {
    vec!["openid".into(), "profile".into()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            tenant_id: default_tenant_id(),
            authority_host: default_authority_host(),
            api_url: default_api_url(),
            login_scopes: default_login_scopes(),
            api_scopes: default_api_scopes(),
        }
    }
}

impl Settings {
    /// Apply environment overrides from an arbitrary lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty(ENV_CLIENT_ID) {
            self.client_id = v;
        }
        if let Some(v) = non_empty(ENV_TENANT_ID) {
            self.tenant_id = v;
        }
        if let Some(v) = non_empty(ENV_API_URL) {
            self.api_url = v;
        }
    }
}

/// Application configuration and token cache
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Stored access token for the last requested scopes
    pub access_token: Option<StoredToken>,
    /// Stored refresh token
    pub refresh_token: Option<String>,
    /// Raw ID token of the signed-in account
    pub id_token: Option<String>,
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "secure-dashboard", "secure-dashboard")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk, with environment overrides applied.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config
            .settings
            .apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }
}

impl TokenStore for Config {
    fn get_access_token(&self) -> Option<StoredToken> {
        self.access_token.clone()
    }

    fn set_access_token(&mut self, token: StoredToken) {
        self.access_token = Some(token);
    }

    fn get_refresh_token(&self) -> Option<String> {
        self.refresh_token.clone()
    }

    fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = Some(token);
    }

    fn get_id_token(&self) -> Option<String> {
        self.id_token.clone()
    }

    fn set_id_token(&mut self, token: String) {
        self.id_token = Some(token);
    }

    fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.id_token = None;
    }
}

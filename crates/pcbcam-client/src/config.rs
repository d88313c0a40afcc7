//! Configuration for the client layer.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Path of the discovery endpoint, relative to `site + api_prefix`.
pub const ENDPOINTS_PATH: &str = "/framework/endpoints";

/// Configuration for connecting to a PCB CAM server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base site URL, e.g. `https://cam.example.com`. Procedure URLs hang off it.
    #[serde(default = "default_site")]
    pub site: String,

    /// Prefix under which the discovery endpoint is mounted.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Top-level descriptor entries that are never turned into namespaces.
    #[serde(default = "default_excluded_namespaces")]
    pub excluded_namespaces: Vec<String>,

    /// Namespace holding the login procedure.
    #[serde(default = "default_login_namespace")]
    pub login_namespace: String,

    /// Procedure exchanging credentials for an API key.
    #[serde(default = "default_login_procedure")]
    pub login_procedure: String,
}

fn default_site() -> String {
    "http://localhost:5000".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_excluded_namespaces() -> Vec<String> {
    vec!["user".to_string()]
}

fn default_login_namespace() -> String {
    "UserApi".to_string()
}

fn default_login_procedure() -> String {
    "api_login".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            api_prefix: default_api_prefix(),
            excluded_namespaces: default_excluded_namespaces(),
            login_namespace: default_login_namespace(),
            login_procedure: default_login_procedure(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given site with default settings.
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Self::default()
        }
    }

    /// Replace the API prefix.
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Replace the namespace exclusion list.
    pub fn with_excluded_namespaces(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.excluded_namespaces = names.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Load configuration from disk with environment overrides.
    pub fn load() -> ClientResult<Self> {
        let config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
            _ => Self::default(),
        };

        Ok(config.with_env_overrides())
    }

    /// Apply `PCBCAM_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> Self {
        Self {
            site: std::env::var("PCBCAM_SITE").unwrap_or(self.site),
            api_prefix: std::env::var("PCBCAM_API_PREFIX").unwrap_or(self.api_prefix),
            excluded_namespaces: std::env::var("PCBCAM_EXCLUDED_NAMESPACES")
                .map(|v| split_list(&v))
                .unwrap_or(self.excluded_namespaces),
            ..self
        }
    }

    /// Save configuration to disk.
    pub fn save(&self) -> ClientResult<()> {
        if let Some(path) = Self::config_file_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(self)?;
            std::fs::write(&path, contents)?;
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "pcbcam", "pcbcam")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Absolute URL of the discovery endpoint.
    pub fn endpoints_url(&self) -> String {
        format!(
            "{}{}{}",
            self.site.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/'),
            ENDPOINTS_PATH
        )
    }

    /// Whether a top-level descriptor entry is kept as a namespace.
    pub fn includes_namespace(&self, name: &str) -> bool {
        !name.starts_with('_') && !self.excluded_namespaces.iter().any(|n| n == name)
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "site" => Some(self.site.clone()),
            "api_prefix" => Some(self.api_prefix.clone()),
            "excluded_namespaces" => Some(self.excluded_namespaces.join(",")),
            "login_namespace" => Some(self.login_namespace.clone()),
            "login_procedure" => Some(self.login_procedure.clone()),
            _ => None,
        }
    }

    /// Set a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) -> ClientResult<()> {
        match key {
            "site" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(ClientError::Config(format!(
                        "Site must be an http(s) URL: {}",
                        value
                    )));
                }
                self.site = value.to_string();
            }
            "api_prefix" => {
                self.api_prefix = value.to_string();
            }
            "excluded_namespaces" => {
                self.excluded_namespaces = split_list(value);
            }
            "login_namespace" => {
                self.login_namespace = value.to_string();
            }
            "login_procedure" => {
                self.login_procedure = value.to_string();
            }
            _ => {
                return Err(ClientError::Config(format!("Unknown config key: {}", key)));
            }
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

//! Configuration Management
//!
//! Settings come from a JSON or YAML file, environment variables and the
//! command line, in increasing order of precedence.

use crate::cmdb::CmdbCredentials;
use crate::notification::{ResourceKind, RoutingPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variables overriding file settings
const ENV_HOSTNAME: &str = "SNOW_HOSTNAME";
const ENV_USER: &str = "SNOW_USER";
const ENV_PASSWORD: &str = "SNOW_PASSWORD";
const ENV_SECRET: &str = "SNOW_SECRET";

/// Format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// YAML for `.yaml`/`.yml`, JSON otherwise
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Pipeline configuration
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// ServiceNow instance host name
    pub cmdb_hostname: Option<String>,
    /// API root replacing `https://<cmdb_hostname>`
    pub cmdb_base_url: Option<String>,
    pub cmdb_user: Option<String>,
    pub cmdb_password: Option<String>,
    /// Secrets Manager secret holding the CMDB credentials
    pub secret_id: Option<String>,
    pub secret_region: Option<String>,
    pub queue_name: Option<String>,
    pub queue_region: Option<String>,
    /// Resource kinds that are mapped but not submitted
    pub construct_only: Vec<ResourceKind>,
    pub accept_db_instances: bool,
    /// Import set table per resource kind, replacing the default table
    pub tables: HashMap<ResourceKind, String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("awsconfig-cmdb").join("config.json"))
    }

    /// Load configuration from `path`, or from the default location if it
    /// exists. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_str(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_str(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).context("Failed to parse JSON config"),
            ConfigFormat::Yaml => serde_yaml::from_str(content).context("Failed to parse YAML config"),
        }
    }

    /// Override file settings with whatever `lookup` finds for the
    /// `SNOW_*` environment variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(hostname) = value(ENV_HOSTNAME) {
            self.cmdb_hostname = Some(hostname);
        }
        if let Some(user) = value(ENV_USER) {
            self.cmdb_user = Some(user);
        }
        if let Some(password) = value(ENV_PASSWORD) {
            self.cmdb_password = Some(password);
        }
        if let Some(secret) = value(ENV_SECRET) {
            self.secret_id = Some(secret);
        }
    }

    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy {
            accept_db_instances: self.accept_db_instances,
            construct_only: self.construct_only.iter().cloned().collect(),
            tables: self.tables.clone(),
        }
    }

    /// Credentials given directly in the configuration
    pub fn static_credentials(&self) -> Result<CmdbCredentials> {
        let missing: Vec<&str> = [
            ("cmdb_hostname", &self.cmdb_hostname),
            ("cmdb_user", &self.cmdb_user),
            ("cmdb_password", &self.cmdb_password),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect();

        match (&self.cmdb_hostname, &self.cmdb_user, &self.cmdb_password) {
            (Some(hostname), Some(user), Some(password)) => Ok(CmdbCredentials {
                hostname: hostname.clone(),
                user: user.clone(),
                password: password.clone(),
            }),
            _ => anyhow::bail!(
                "CMDB credentials incomplete, missing {} (or configure secret_id)",
                missing.join(", ")
            ),
        }
    }

    /// API root for `credentials`
    pub fn base_url(&self, credentials: &CmdbCredentials) -> String {
        self.cmdb_base_url
            .clone()
            .unwrap_or_else(|| credentials.base_url())
    }
}

//! Configuration management
//!
//! Configuration is read from an optional YAML document and then overridden
//! by command-line/environment values. Every field has a default except the
//! database URL, which must be present once overrides are applied.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the YAML configuration file
pub const CONFIG_ENV_VAR: &str = "STARDB_CONFIG";

/// SIMBAD TAP synchronous query endpoint
pub const DEFAULT_NAME_AUTHORITY_URL: &str = "https://simbad.cds.unistra.fr/simbad/sim-tap/sync";

const DEFAULT_NAME_AUTHORITY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration for '{field}': {message}")]
    Invalid { field: String, message: String },
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_min_connections() -> u32 {
    DEFAULT_MIN_CONNECTIONS
}

fn default_name_authority_url() -> String {
    DEFAULT_NAME_AUTHORITY_URL.to_string()
}

fn default_name_authority_timeout() -> u64 {
    DEFAULT_NAME_AUTHORITY_TIMEOUT_SECS
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
        }
    }
}

/// Location of the per-datatype table template document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Overrides the built-in template document for the connected backend
    pub templates: Option<PathBuf>,
}

/// External name-authority service used to resolve star identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameAuthorityConfig {
    #[serde(default = "default_name_authority_url")]
    pub url: String,
    #[serde(default = "default_name_authority_timeout")]
    pub timeout_secs: u64,
}

impl Default for NameAuthorityConfig {
    fn default() -> Self {
        Self {
            url: default_name_authority_url(),
            timeout_secs: default_name_authority_timeout(),
        }
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StarDbConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub name_authority: NameAuthorityConfig,
}

impl StarDbConfig {
    /// Parse a YAML configuration document
    pub fn from_yaml_str(document: &str) -> Result<Self, ConfigError> {
        if document.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(document)?)
    }

    /// Read and parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&document)
    }

    /// Load configuration from `path`, or from the file named by
    /// `STARDB_CONFIG`, or fall back to defaults when neither is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(env_path) => Self::from_file(Path::new(&env_path)),
                None => Ok(Self::default()),
            },
        }
    }

    /// Replace the database URL when an override is supplied
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.database.url = url;
        }
        self
    }

    /// Replace the template document path when an override is supplied
    pub fn with_templates(mut self, templates: Option<PathBuf>) -> Self {
        if templates.is_some() {
            self.schema.templates = templates;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database.url".to_string(),
                message: "a database URL is required".to_string(),
            });
        }
        url::Url::parse(&self.database.url).map_err(|e| ConfigError::Invalid {
            field: "database.url".to_string(),
            message: e.to_string(),
        })?;
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                field: "database.min_connections".to_string(),
                message: format!(
                    "min_connections ({}) exceeds max_connections ({})",
                    self.database.min_connections, self.database.max_connections
                ),
            });
        }
        url::Url::parse(&self.name_authority.url).map_err(|e| ConfigError::Invalid {
            field: "name_authority.url".to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

//! Configuration module for evhook-server.
//!
//! Handles loading configuration from TOML files and CLI arguments, and
//! validating it before any socket is bound.

pub mod file;
pub mod runtime;

use crate::config::file::{ApplicationConfig as FileApplicationConfig, FileConfig};
use crate::config::runtime::{ApplicationConfig, ServerConfig};
use evhook_sdk::signature::{SignatureError, VerifyKey};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid verify key for {path}: {source}")]
    InvalidKey {
        path: String,
        #[source]
        source: SignatureError,
    },
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub applications: Vec<ApplicationConfig>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    quiet: bool,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            quiet: false,
        }
    }

    /// Force diagnostic logging off regardless of the file.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Decode the verify keys
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if self.quiet {
            file_config.server.basic_log = false;
        }

        self.validate(&file_config)?;

        let applications = file_config
            .applications
            .into_iter()
            .map(convert_application)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
                basic_log: file_config.server.basic_log,
            },
            applications,
        })
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.applications.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one application must be configured".to_owned(),
            ));
        }

        let mut seen = HashSet::new();
        for application in &config.applications {
            if !application.url_path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "url_path {:?} must start with '/'",
                    application.url_path
                )));
            }
            if !seen.insert(application.url_path.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "url_path {:?} is configured more than once",
                    application.url_path
                )));
            }
            if application.events.as_ref().is_some_and(Vec::is_empty) {
                return Err(ConfigError::ValidationError(format!(
                    "application {} lists no events",
                    application.url_path
                )));
            }
        }
        Ok(())
    }
}

fn convert_application(a: FileApplicationConfig) -> Result<ApplicationConfig, ConfigError> {
    let events = a.event_kinds();
    let verify_key =
        VerifyKey::from_hex(&a.verify_key).map_err(|source| ConfigError::InvalidKey {
            path: a.url_path.clone(),
            source,
        })?;
    Ok(ApplicationConfig {
        url_path: a.url_path,
        verify_key,
        events,
    })
}

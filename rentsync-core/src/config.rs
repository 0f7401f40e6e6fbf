//! Runtime settings.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file at
//! `~/.config/rentsync/config.toml` (or an explicit path), then environment
//! variables such as `RENTSYNC__STORE__SERVICE_KEY`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::{DEFAULT_PUSH_ENDPOINT, DEFAULT_USER_AGENT, UPSERT_BATCH_SIZE};
use crate::error::{RentSyncError, RentSyncResult};
use crate::push::ExpoPushGateway;
use crate::store::RestStore;
use crate::sync::FeedClient;

fn default_push_endpoint() -> String {
    DEFAULT_PUSH_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_batch_size() -> usize {
    UPSERT_BATCH_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub push: PushSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Managed backend connection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    #[serde(default = "default_push_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for PushSettings {
    fn default() -> Self {
        PushSettings {
            endpoint: default_push_endpoint(),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            user_agent: default_user_agent(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind: default_bind(),
        }
    }
}

impl Settings {
    pub fn config_path() -> RentSyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RentSyncError::Config("Could not determine config directory".into()))?
            .join("rentsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings, reading `path` instead of the default file when given.
    ///
    /// A missing default file is fine; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> RentSyncResult<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Self::config_path()?).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("RENTSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| RentSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| RentSyncError::Config(e.to_string()))
    }

    pub fn rest_store(&self) -> RentSyncResult<RestStore> {
        if self.store.url.is_empty() || self.store.service_key.is_empty() {
            return Err(RentSyncError::Config(
                "store.url and store.service_key must be set".into(),
            ));
        }
        RestStore::new(&self.store.url, self.store.service_key.clone())
    }

    pub fn push_gateway(&self) -> ExpoPushGateway {
        ExpoPushGateway::new(self.push.endpoint.clone(), self.push.access_token.clone())
    }

    pub fn feed_client(&self) -> RentSyncResult<FeedClient> {
        FeedClient::new(
            &self.sync.user_agent,
            Duration::from_secs(self.sync.timeout_secs),
        )
    }
}

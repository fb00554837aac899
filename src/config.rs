use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{censor, error, remote_control};

/// The config of the censoring companion
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub user: User,
    pub remote_control: RemoteControlConfig,
    pub censor: CensorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
}

/// How to reach the streaming tool
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteControlConfig {
    /// Disable the remote entirely, censoring then degrades to pausing
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Which streaming tool is listening on the other side
    pub dialect: remote_control::Dialect,

    pub host: String,
    pub port: u16,
    pub auth_secret: String,

    /// How long connect() may take before giving up
    pub connect_timeout_ms: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CensorConfig {
    /// Scene shown while a switch-scene segment is active
    pub censor_scene: String,

    /// Bound on scene calls made from the tick loop
    pub remote_timeout_ms: Option<u64>,
}

impl From<&RemoteControlConfig> for remote_control::ConnectionOptions {
    fn from(config: &RemoteControlConfig) -> Self {
        Self {
            dialect: config.dialect,
            host: config.host.clone(),
            port: config.port,
            auth_secret: config.auth_secret.clone(),
        }
    }
}

impl From<&CensorConfig> for censor::CensorOptions {
    fn from(config: &CensorConfig) -> Self {
        Self {
            censor_scene: config.censor_scene.clone(),
            remote_timeout: config
                .remote_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(censor::DEFAULT_REMOTE_TIMEOUT),
        }
    }
}

pub trait ConfigLogic: Send + Sync {
    fn load(&self) -> Result<Config, error::Error>;
}

pub struct File {
    pub name: std::path::PathBuf,
}

impl ConfigLogic for File {
    fn load(&self) -> Result<Config, error::Error> {
        let file = std::fs::File::open(&self.name).map_err(error::Error::ConfigFileError)?;
        let config: Config = serde_json::from_reader(file)?;

        Ok(config)
    }
}

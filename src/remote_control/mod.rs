pub mod client;
pub mod correlator;
pub mod dialect;
pub mod obs_studio;
pub mod streamlabs;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

use serde::{Deserialize, Serialize};

pub use client::Client;

/// Wire protocol spoken by the streaming tool on the other end.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    Streamlabs,
    ObsStudio,
}

/// Connection settings for one client, fixed for its whole lifetime.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub auth_secret: String,
}

impl ConnectionOptions {
    pub fn url(&self, path: &str) -> String {
        format!("ws://{}:{}{}", self.host, self.port, path)
    }
}

/// A scene as reported by the streaming tool.
///
/// The `id` is dialect specific, a Streamlabs scene id or an OBS Studio
/// scene uuid. The `name` is what users configure and is the only field
/// that is comparable across dialects.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

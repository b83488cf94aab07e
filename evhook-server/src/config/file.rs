//! TOML file configuration structures.
//!
//! These structs directly map to the `evhook-config.toml` file format.

use evhook_sdk::objects::EventKind;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Log handshakes, received events, signature failures and empty
    /// events.
    #[serde(default = "default_basic_log")]
    pub basic_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            basic_log: default_basic_log(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_basic_log() -> bool {
    true
}

/// One application endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Path webhooks are delivered to, e.g. "/webhook1".
    pub url_path: String,
    /// Hex-encoded Ed25519 public key from the developer portal.
    pub verify_key: String,
    /// Event kinds to handle. All kinds when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventKind>>,
}

impl ApplicationConfig {
    /// The configured kinds, or the whole catalog.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        self.events
            .clone()
            .unwrap_or_else(|| EventKind::ALL.to_vec())
    }
}

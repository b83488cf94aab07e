//! Validated configuration, ready to build applications from.

use evhook_sdk::objects::EventKind;
use evhook_sdk::signature::VerifyKey;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub basic_log: bool,
}

/// An application endpoint with a decoded key.
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    pub url_path: String,
    pub verify_key: VerifyKey,
    pub events: Vec<EventKind>,
}

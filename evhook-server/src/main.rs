//! evhook server
//!
//! Receives signed webhook events for the configured applications and logs
//! every verified event.

use clap::Parser;
use evhook_core::{Application, ApplicationError};
use evhook_sdk::objects::Event;
use evhook_server::config::ConfigLoader;
use evhook_server::config::runtime::ApplicationConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// evhook - verify and dispatch webhook events
#[derive(Parser, Debug)]
#[command(name = "evhook-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "EVHOOK_CONFIG", default_value = "./evhook-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Disable handshake, event and signature-failure notices
    #[arg(long, default_value = "false")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting evhook-server v{}", env!("CARGO_PKG_VERSION"));

    let loaded_config = ConfigLoader::new(&args.config, args.listen)
        .quiet(args.quiet)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let applications = loaded_config
        .applications
        .into_iter()
        .map(build_application)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!("Invalid application configuration: {}", e);
            e
        })?;

    let server = loaded_config.server;
    tracing::info!("Starting HTTP server on {}", server.listen);
    evhook_server::listen(server.listen, applications, server.basic_log)
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            e
        })?;

    Ok(())
}

/// An application that logs every configured event kind.
fn build_application(config: ApplicationConfig) -> Result<Application, ApplicationError> {
    let mut application = Application::new(config.url_path, config.verify_key)?;
    for kind in config.events {
        application.register_handler(kind, log_event);
    }
    Ok(application)
}

async fn log_event(event: Event, occurred_at: OffsetDateTime) -> anyhow::Result<()> {
    tracing::info!(kind = %event.kind(), %occurred_at, payload = ?event, "Event received");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use evhook_sdk::objects::EventKind;
    use evhook_sdk::signature::VerifyKey;
    use serde_json::json;

    #[tokio::test]
    async fn test_build_application_registers_configured_kinds() {
        let application = build_application(ApplicationConfig {
            url_path: "/webhook1".to_owned(),
            verify_key: VerifyKey::from([0u8; 32]),
            events: vec![EventKind::EntitlementCreate, EventKind::ApplicationAuthorized],
        })
        .unwrap();

        assert_eq!(
            application.handled_kinds(),
            vec![EventKind::ApplicationAuthorized, EventKind::EntitlementCreate]
        );

        let event = Event::decode(
            EventKind::ApplicationAuthorized,
            json!({"user": {"username": "alice"}}),
        )
        .unwrap();
        let handler = application
            .lookup_handler(EventKind::ApplicationAuthorized)
            .unwrap();
        handler
            .handle(event, OffsetDateTime::UNIX_EPOCH)
            .await
            .unwrap();
    }
}

//! Axum server setup and router configuration.

use crate::api::webhook;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Router, extract::DefaultBodyLimit};
use evhook_core::{Application, ApplicationRegistry, Dispatcher, RegistryError};
use thiserror::Error;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Largest request body accepted, in bytes.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Errors that stop a listener from starting or serving.
#[derive(Debug, Error)]
pub enum ListenError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the webhook router.
///
/// Every path is handled by the webhook endpoint, which answers `404` for
/// paths without a registered application.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(webhook::receive)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: impl ToSocketAddrs) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Serve `applications` on `addr` until SIGINT or SIGTERM.
pub async fn listen(
    addr: impl ToSocketAddrs,
    applications: impl IntoIterator<Item = Application>,
    basic_log: bool,
) -> Result<(), ListenError> {
    let registry = ApplicationRegistry::from_applications(applications)?;
    for path in registry.paths() {
        tracing::info!(path, "Serving webhook endpoint");
    }

    let state = AppState::new(registry, Dispatcher::new(basic_log));
    run_server(build_router(state), addr).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve `applications` on `host:port` until SIGINT or SIGTERM.
///
/// Fails before binding if two applications share a path.
pub async fn start_listening(
    host: &str,
    port: u16,
    applications: impl IntoIterator<Item = Application>,
    basic_log: bool,
) -> Result<(), ListenError> {
    listen((host, port), applications, basic_log).await
}

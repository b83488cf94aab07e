//! HTTP listener for signed webhook events.
//!
//! Routes each request to the [`Application`](evhook_core::Application)
//! registered for its path, verifies and decodes it through the
//! [`Dispatcher`](evhook_core::Dispatcher) and answers with the status the
//! delivering platform expects.

pub mod api;
pub mod config;
pub mod server;
pub mod shutdown;
pub mod state;

pub use server::{ListenError, MAX_BODY_SIZE, build_router, listen, run_server, start_listening};
pub use state::AppState;

//! Application state shared across all request handlers.

use evhook_core::{ApplicationRegistry, Dispatcher};
use std::sync::Arc;

/// State shared by every request.
///
/// Cheap to clone. The registry is frozen once the router is built, so no
/// locking is involved on the request path.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ApplicationRegistry>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(registry: ApplicationRegistry, dispatcher: Dispatcher) -> Self {
        Self {
            registry: Arc::new(registry),
            dispatcher,
        }
    }
}

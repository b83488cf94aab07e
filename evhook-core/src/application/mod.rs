//! Applications and their handler tables.
//!
//! An [`Application`] is identified by the URL path its webhooks are
//! delivered to. It owns the public key used to verify those webhooks and a
//! table mapping each [`EventKind`] to at most one handler.
//!
//! Handlers are registered before listening starts. Once an application is
//! handed to a listener it is shared behind an `Arc` and never mutated, so
//! lookups need no locking.

mod handler;
mod registry;

pub use handler::{EventHandler, TypedHandler};
pub use registry::{ApplicationRegistry, RegistryError};

use evhook_sdk::objects::{EventKind, EventPayload};
use evhook_sdk::signature::VerifyKey;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors produced when constructing an [`Application`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("url path must not be empty")]
    EmptyPath,
    #[error("url path must start with '/': {0:?}")]
    RelativePath(String),
}

/// An application receiving webhook events on one endpoint path.
pub struct Application {
    url_path: String,
    verify_key: VerifyKey,
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl Application {
    /// Create an application with an empty handler table.
    ///
    /// `url_path` is the path of the webhook endpoint as configured on the
    /// developer portal, e.g. `/webhook1`.
    pub fn new(
        url_path: impl Into<String>,
        verify_key: impl Into<VerifyKey>,
    ) -> Result<Self, ApplicationError> {
        let url_path = url_path.into();
        if url_path.is_empty() {
            return Err(ApplicationError::EmptyPath);
        }
        if !url_path.starts_with('/') {
            return Err(ApplicationError::RelativePath(url_path));
        }
        Ok(Self {
            url_path,
            verify_key: verify_key.into(),
            handlers: HashMap::new(),
        })
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    pub fn verify_key(&self) -> &VerifyKey {
        &self.verify_key
    }

    /// Register `handler` for `kind`, replacing any previous handler.
    pub fn register_handler(&mut self, kind: EventKind, handler: impl EventHandler) -> &mut Self {
        if self.handlers.insert(kind, Arc::new(handler)).is_some() {
            tracing::debug!(path = %self.url_path, %kind, "Replaced existing event handler");
        }
        self
    }

    /// Register a handler for the kind carried by payload type `T`.
    ///
    /// ```ignore
    /// app.on_event(|event: ApplicationAuthorized, at: OffsetDateTime| async move {
    ///     tracing::info!(user = %event.user.username, %at, "authorized");
    ///     anyhow::Ok(())
    /// });
    /// ```
    pub fn on_event<T, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        T: EventPayload,
        F: Fn(T, OffsetDateTime) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_handler(T::KIND, TypedHandler::new(handler))
    }

    /// The handler registered for `kind`, if any.
    pub fn lookup_handler(&self, kind: EventKind) -> Option<Arc<dyn EventHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Kinds with a registered handler, in catalog order.
    pub fn handled_kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("url_path", &self.url_path)
            .field("verify_key", &self.verify_key)
            .field("handlers", &self.handled_kinds())
            .finish()
    }
}

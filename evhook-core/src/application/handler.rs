//! Asynchronous event handlers.
//!
//! Handlers are stored type-erased as `Arc<dyn EventHandler>` in an
//! application's handler table. Any `Fn(Event, OffsetDateTime)` closure
//! returning a `Send` future implements [`EventHandler`]; typed handlers
//! taking a single payload type are wrapped in [`TypedHandler`].

use async_trait::async_trait;
use evhook_sdk::objects::{Event, EventPayload};
use std::future::Future;
use std::marker::PhantomData;
use time::OffsetDateTime;

/// A handler invoked with a decoded event and its occurrence instant.
///
/// Errors are logged by the dispatcher and never reach the HTTP response.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: Event, occurred_at: OffsetDateTime) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(Event, OffsetDateTime) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: Event, occurred_at: OffsetDateTime) -> anyhow::Result<()> {
        (self)(event, occurred_at).await
    }
}

/// Adapts a handler over one payload type to [`EventHandler`].
pub struct TypedHandler<T, F> {
    handler: F,
    _payload: PhantomData<fn(T)>,
}

impl<T, F> TypedHandler<T, F> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> EventHandler for TypedHandler<T, F>
where
    T: EventPayload,
    F: Fn(T, OffsetDateTime) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: Event, occurred_at: OffsetDateTime) -> anyhow::Result<()> {
        let received = event.kind();
        let Some(payload) = T::from_event(event) else {
            anyhow::bail!("handler for {} received a {received} event", T::KIND);
        };
        (self.handler)(payload, occurred_at).await
    }
}

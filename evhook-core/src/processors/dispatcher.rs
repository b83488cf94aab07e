//! Dispatcher processor.
//!
//! The Dispatcher takes one webhook request addressed to an application
//! and drives it through:
//!
//! - Signature verification over `timestamp || body`
//! - Classification of the body (handshake or event)
//! - Handler lookup in the application's handler table
//! - Fire-and-forget invocation of the handler on its own task
//!
//! The returned [`DispatchOutcome`] is everything the listener needs to
//! answer the request. Handler completion is never awaited, and handler
//! failures are logged at the task boundary.

use crate::application::{Application, EventHandler};
use crate::decoder::{self, DecodeError, DecodedRequest};
use evhook_sdk::objects::{Event, EventKind};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{Instrument, debug, error, info, warn};

/// A single inbound request, borrowed from the transport.
#[derive(Debug, Clone, Copy)]
pub struct IncomingRequest<'a> {
    /// Value of the signature header, if present.
    pub signature: Option<&'a str>,
    /// Value of the timestamp header, if present.
    pub timestamp: Option<&'a str>,
    /// The exact body bytes received.
    pub body: &'a [u8],
}

/// Terminal state of a dispatched request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A verified handshake. No handler is involved.
    Handshake,
    /// A handler was scheduled for this event kind.
    Dispatched(EventKind),
    /// The request was valid but nothing was scheduled.
    Ignored(IgnoreReason),
    /// The request was refused.
    Rejected(RejectReason),
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DispatchOutcome::Rejected(_))
    }
}

/// Why a valid event produced no dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event carried no data.
    EmptyData(String),
    /// The event kind is not in the catalog.
    UnknownKind(String),
    /// No handler is registered for the kind.
    NoHandler(EventKind),
}

/// Why a request was refused.
#[derive(Debug, Error)]
pub enum RejectReason {
    /// The signature or timestamp header is missing.
    #[error("missing signature headers")]
    MissingSignature,
    /// The signature does not verify against the application's key.
    #[error("invalid request signature")]
    SignatureInvalid,
    /// The body could not be classified.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] DecodeError),
}

/// Dispatches webhook requests to application handlers.
///
/// `basic_log` enables info notices for handshakes and received events and
/// warnings for signature failures and empty events. Handler failures are
/// logged regardless.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    basic_log: bool,
}

impl Dispatcher {
    pub fn new(basic_log: bool) -> Self {
        Self { basic_log }
    }

    /// Dispatch one request addressed to `application`.
    ///
    /// Must be called from within a Tokio runtime: handlers are spawned
    /// with [`tokio::spawn`].
    pub fn dispatch(
        &self,
        application: &Application,
        request: IncomingRequest<'_>,
    ) -> DispatchOutcome {
        let path = application.url_path();

        let (Some(signature), Some(timestamp)) = (request.signature, request.timestamp) else {
            if self.basic_log {
                warn!(
                    path,
                    "Failed to verify request signature (either signature or timestamp is missing)"
                );
            }
            return DispatchOutcome::Rejected(RejectReason::MissingSignature);
        };

        if !application
            .verify_key()
            .verify_hex(timestamp, request.body, signature)
        {
            if self.basic_log {
                warn!(path, signature, "Failed to verify request signature (invalid signature)");
            }
            return DispatchOutcome::Rejected(RejectReason::SignatureInvalid);
        }

        let decoded = match decoder::decode(request.body) {
            Ok(decoded) => decoded,
            Err(e) => {
                if self.basic_log {
                    warn!(path, error = %e, "Rejecting malformed webhook payload");
                }
                return DispatchOutcome::Rejected(e.into());
            }
        };

        match decoded {
            DecodedRequest::Handshake => {
                if self.basic_log {
                    info!(path, "Received a handshake");
                }
                DispatchOutcome::Handshake
            }
            DecodedRequest::EmptyData { kind } => {
                if self.basic_log {
                    warn!(path, kind = %kind, "Ignoring an event without data: {kind}");
                }
                DispatchOutcome::Ignored(IgnoreReason::EmptyData(kind))
            }
            DecodedRequest::UnknownKind { kind } => {
                if self.basic_log {
                    info!(path, kind = %kind, "Received an event: {kind}");
                }
                debug!(path, kind = %kind, "Ignoring event of unknown kind");
                DispatchOutcome::Ignored(IgnoreReason::UnknownKind(kind))
            }
            DecodedRequest::Event { event, occurred_at } => {
                let kind = event.kind();
                if self.basic_log {
                    info!(path, %kind, "Received an event: {kind}");
                }
                match application.lookup_handler(kind) {
                    Some(handler) => {
                        spawn_handler(path, handler, event, occurred_at);
                        DispatchOutcome::Dispatched(kind)
                    }
                    None => {
                        debug!(path, %kind, "No handler registered, ignoring event");
                        DispatchOutcome::Ignored(IgnoreReason::NoHandler(kind))
                    }
                }
            }
        }
    }
}

/// Run `handler` on its own task and drop the join handle.
///
/// Errors and panics stay inside the task and are only logged.
fn spawn_handler(
    path: &str,
    handler: Arc<dyn EventHandler>,
    event: Event,
    occurred_at: OffsetDateTime,
) {
    let path = path.to_owned();
    let kind = event.kind();

    let task = async move {
        let result = AssertUnwindSafe(handler.handle(event, occurred_at))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                debug!(path = %path, %kind, "Event handler completed");
            }
            Ok(Err(e)) => {
                warn!(path = %path, %kind, error = %format!("{e:#}"), "Event handler failed");
            }
            Err(_) => {
                error!(path = %path, %kind, "Event handler panicked");
            }
        }
    };

    tokio::spawn(task.in_current_span());
}

#[cfg(test)]
mod tests {
    use super::*;
    use evhook_sdk::objects::{ApplicationAuthorized, ApplicationDeauthorized};
    use evhook_sdk::signature::sign_request;
    use ring::signature::{Ed25519KeyPair, KeyPair};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Notify, mpsc};

    const TIMESTAMP: &str = "1700000123";
    const AUTHORIZED: &str = r#"{"type":0,"event":{"type":"APPLICATION_AUTHORIZED","data":{"user":{"username":"alice"}}},"ts":1700000000}"#;
    const DEAUTHORIZED: &str = r#"{"type":0,"event":{"type":"APPLICATION_DEAUTHORIZED","data":{"user":{"username":"bob"}}},"ts":1700000001}"#;

    fn key_pair(seed: u8) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed_unchecked(&[seed; 32]).unwrap()
    }

    fn application(path: &str, kp: &Ed25519KeyPair) -> Application {
        let public_key: &[u8] = kp.public_key().as_ref();
        Application::new(path, public_key).unwrap()
    }

    fn dispatch(
        dispatcher: &Dispatcher,
        app: &Application,
        kp: &Ed25519KeyPair,
        body: &str,
    ) -> DispatchOutcome {
        let signature = sign_request(kp, TIMESTAMP, body.as_bytes());
        dispatcher.dispatch(
            app,
            IncomingRequest {
                signature: Some(&signature),
                timestamp: Some(TIMESTAMP),
                body: body.as_bytes(),
            },
        )
    }

    fn counting_app(
        path: &str,
        kp: &Ed25519KeyPair,
        kind: EventKind,
    ) -> (Application, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut app = application(path, kp);
        let counter = calls.clone();
        app.register_handler(kind, move |_: Event, _: OffsetDateTime| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });
        (app, calls)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_event_invokes_handler_once() {
        let kp = key_pair(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = application("/webhook1", &kp);
        app.on_event(move |event: ApplicationAuthorized, at: OffsetDateTime| {
            let tx = tx.clone();
            async move {
                tx.send((event.user.username, at))?;
                anyhow::Ok(())
            }
        });

        let outcome = dispatch(&Dispatcher::new(true), &app, &kp, AUTHORIZED);
        assert!(matches!(
            outcome,
            DispatchOutcome::Dispatched(EventKind::ApplicationAuthorized)
        ));
        assert!(outcome.is_success());

        let (username, at) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(username, "alice");
        assert_eq!(at, OffsetDateTime::from_unix_timestamp(1700000000).unwrap());

        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handshake_never_invokes_handlers() {
        let kp = key_pair(1);
        let (mut app, calls) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);
        let counter = calls.clone();
        app.register_handler(EventKind::ApplicationDeauthorized, move |_: Event, _: OffsetDateTime| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });

        let outcome = dispatch(&Dispatcher::default(), &app, &kp, r#"{"type":1}"#);
        assert!(matches!(outcome, DispatchOutcome::Handshake));
        assert!(outcome.is_success());

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_handler_is_ignored() {
        let kp = key_pair(1);
        let (app, calls) = counting_app("/webhook1", &kp, EventKind::ApplicationDeauthorized);

        let outcome = dispatch(&Dispatcher::default(), &app, &kp, AUTHORIZED);
        assert!(matches!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::NoHandler(EventKind::ApplicationAuthorized))
        ));
        assert!(outcome.is_success());

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_ignored() {
        let kp = key_pair(1);
        let (app, calls) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);

        let body = r#"{"type":0,"event":{"type":"SOMETHING_NEW","data":{"x":1}},"ts":1}"#;
        let outcome = dispatch(&Dispatcher::default(), &app, &kp, body);
        assert!(matches!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::UnknownKind(ref kind)) if kind == "SOMETHING_NEW"
        ));

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_empty_data_warns_and_ignores() {
        let kp = key_pair(1);
        let (app, calls) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);

        let body = r#"{"type":0,"event":{"type":"APPLICATION_AUTHORIZED","data":{}},"ts":1}"#;
        let outcome = dispatch(&Dispatcher::new(true), &app, &kp, body);
        assert!(matches!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::EmptyData(ref kind)) if kind == "APPLICATION_AUTHORIZED"
        ));

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(logs_contain("Ignoring an event without data"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_diagnostics_enabled_notices() {
        let kp = key_pair(1);
        let (app, calls) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);
        let dispatcher = Dispatcher::new(true);

        dispatch(&dispatcher, &app, &kp, r#"{"type":1}"#);
        dispatch(&dispatcher, &app, &kp, AUTHORIZED);
        let empty = r#"{"type":0,"event":{"type":"APPLICATION_AUTHORIZED","data":{}},"ts":1}"#;
        dispatch(&dispatcher, &app, &kp, empty);

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(logs_contain("Received a handshake"));
        assert!(logs_contain("Received an event: APPLICATION_AUTHORIZED"));
        logs_assert(|lines: &[&str]| {
            let notice = |level: &str, message: &str| {
                lines
                    .iter()
                    .filter(|line| line.contains(level) && line.contains(message))
                    .count()
            };
            if notice("INFO", "Received a handshake") != 1 {
                return Err("expected one info notice for the handshake".to_owned());
            }
            if notice("INFO", "Received an event") != 1 {
                return Err("expected one info notice for the event".to_owned());
            }
            match lines.iter().filter(|line| line.contains("WARN")).count() {
                1 if notice("WARN", "Ignoring an event without data") == 1 => Ok(()),
                n => Err(format!("expected exactly one warning, got {n}")),
            }
        });
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_diagnostics_disabled_is_silent() {
        let kp = key_pair(1);
        let (app, _) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);

        let body = r#"{"type":0,"event":{"type":"APPLICATION_AUTHORIZED"},"ts":1}"#;
        dispatch(&Dispatcher::new(false), &app, &kp, body);
        dispatch(&Dispatcher::new(false), &app, &kp, r#"{"type":1}"#);

        assert!(!logs_contain("Ignoring an event without data"));
        assert!(!logs_contain("Received a handshake"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_bad_signature_is_rejected() {
        let kp = key_pair(1);
        let (app, calls) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);
        let dispatcher = Dispatcher::new(true);

        // Signed by a different key.
        let outcome = dispatch(&dispatcher, &app, &key_pair(2), AUTHORIZED);
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(RejectReason::SignatureInvalid)
        ));
        assert!(!outcome.is_success());

        // Signature over a different timestamp.
        let signature = sign_request(&kp, TIMESTAMP, AUTHORIZED.as_bytes());
        let outcome = dispatcher.dispatch(
            &app,
            IncomingRequest {
                signature: Some(&signature),
                timestamp: Some("1700000124"),
                body: AUTHORIZED.as_bytes(),
            },
        );
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(RejectReason::SignatureInvalid)
        ));

        // Garbage signature encoding.
        let outcome = dispatcher.dispatch(
            &app,
            IncomingRequest {
                signature: Some("zz"),
                timestamp: Some(TIMESTAMP),
                body: AUTHORIZED.as_bytes(),
            },
        );
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(RejectReason::SignatureInvalid)
        ));

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(logs_contain("invalid signature"));
    }

    #[tokio::test]
    async fn test_missing_headers_are_rejected() {
        let kp = key_pair(1);
        let (app, _) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);
        let signature = sign_request(&kp, TIMESTAMP, AUTHORIZED.as_bytes());

        let cases = [
            (None, Some(TIMESTAMP)),
            (Some(signature.as_str()), None),
            (None, None),
        ];
        for (signature, timestamp) in cases {
            let outcome = Dispatcher::default().dispatch(
                &app,
                IncomingRequest {
                    signature,
                    timestamp,
                    body: AUTHORIZED.as_bytes(),
                },
            );
            assert!(matches!(
                outcome,
                DispatchOutcome::Rejected(RejectReason::MissingSignature)
            ));
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected_after_verification() {
        let kp = key_pair(1);
        let (app, _) = counting_app("/webhook1", &kp, EventKind::ApplicationAuthorized);

        let outcome = dispatch(&Dispatcher::default(), &app, &kp, "{not json");
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(RejectReason::MalformedPayload(DecodeError::Json(_)))
        ));

        let outcome = dispatch(&Dispatcher::default(), &app, &kp, r#"{"type":0}"#);
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(RejectReason::MalformedPayload(DecodeError::MissingEvent))
        ));
    }

    #[tokio::test]
    async fn test_slow_handler_does_not_block_later_events() {
        let kp = key_pair(1);
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = application("/webhook1", &kp);

        let blocked = gate.clone();
        let first_tx = tx.clone();
        app.on_event(move |_: ApplicationAuthorized, _: OffsetDateTime| {
            let blocked = blocked.clone();
            let tx = first_tx.clone();
            async move {
                blocked.notified().await;
                tx.send("authorized")?;
                anyhow::Ok(())
            }
        });
        app.on_event(move |_: ApplicationDeauthorized, _: OffsetDateTime| {
            let tx = tx.clone();
            async move {
                tx.send("deauthorized")?;
                anyhow::Ok(())
            }
        });

        let dispatcher = Dispatcher::default();
        dispatch(&dispatcher, &app, &kp, AUTHORIZED);
        dispatch(&dispatcher, &app, &kp, DEAUTHORIZED);

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(first, Some("deauthorized"));

        gate.notify_one();
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(second, Some("authorized"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_handler_failures_stay_in_the_task() {
        let kp = key_pair(1);
        let mut app = application("/webhook1", &kp);
        app.on_event(|event: ApplicationAuthorized, _: OffsetDateTime| async move {
            anyhow::ensure!(event.user.username != "alice", "database unavailable");
            anyhow::Ok(())
        });
        app.on_event(|event: ApplicationDeauthorized, _: OffsetDateTime| async move {
            if event.user.username == "bob" {
                panic!("handler bug");
            }
            anyhow::Ok(())
        });

        let dispatcher = Dispatcher::default();
        assert!(dispatch(&dispatcher, &app, &kp, AUTHORIZED).is_success());
        assert!(dispatch(&dispatcher, &app, &kp, DEAUTHORIZED).is_success());

        settle().await;
        assert!(logs_contain("Event handler failed"));
        assert!(logs_contain("database unavailable"));
        assert!(logs_contain("Event handler panicked"));

        // The dispatcher keeps working afterwards.
        assert!(matches!(
            dispatch(&dispatcher, &app, &kp, r#"{"type":1}"#),
            DispatchOutcome::Handshake
        ));
    }

    #[tokio::test]
    async fn test_applications_are_isolated() {
        let kp_a = key_pair(1);
        let kp_b = key_pair(2);
        let (app_a, calls_a) = counting_app("/a", &kp_a, EventKind::ApplicationAuthorized);
        let (app_b, calls_b) = counting_app("/b", &kp_b, EventKind::ApplicationAuthorized);
        let dispatcher = Dispatcher::default();

        for _ in 0..5 {
            dispatch(&dispatcher, &app_a, &kp_a, AUTHORIZED);
        }
        // Traffic for B signed with A's key never reaches B's handler.
        dispatch(&dispatcher, &app_b, &kp_a, AUTHORIZED);

        settle().await;
        assert_eq!(calls_a.load(Ordering::SeqCst), 5);
        assert_eq!(calls_b.load(Ordering::SeqCst), 0);
    }
}

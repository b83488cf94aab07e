//! Custom Axum extractors for webhook requests.
//!
//! [`WebhookRequest`] resolves the target application from the request
//! path, collects the signature headers and buffers the body. Signature
//! verification itself is left to the dispatcher so that every refusal is
//! logged in one place.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, rejection::BytesRejection},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use evhook_core::{Application, IncomingRequest};
use evhook_sdk::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use std::sync::Arc;

use crate::state::AppState;

/// A webhook request addressed to a registered application.
///
/// Header values that are absent or not valid UTF-8 are `None`; the
/// dispatcher refuses such requests as unsigned.
#[derive(Debug)]
pub struct WebhookRequest {
    pub application: Arc<Application>,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub body: Bytes,
}

impl WebhookRequest {
    /// Borrow the request in the form the dispatcher consumes.
    pub fn as_incoming(&self) -> IncomingRequest<'_> {
        IncomingRequest {
            signature: self.signature.as_deref(),
            timestamp: self.timestamp.as_deref(),
            body: &self.body,
        }
    }
}

/// Errors returned by the [`WebhookRequest`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum WebhookRejection {
    #[error("no application is registered for {0}")]
    UnknownPath(String),
    #[error("method {0} is not allowed")]
    MethodNotAllowed(Method),
    #[error(transparent)]
    Body(#[from] BytesRejection),
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        match self {
            WebhookRejection::UnknownPath(_) => StatusCode::NOT_FOUND.into_response(),
            WebhookRejection::MethodNotAllowed(_) => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "POST")],
            )
                .into_response(),
            // Oversized bodies surface here as 413.
            WebhookRejection::Body(rejection) => rejection.into_response(),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

impl FromRequest<AppState> for WebhookRequest {
    type Rejection = WebhookRejection;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let path = req.uri().path();
        let application = state
            .registry
            .get(path)
            .cloned()
            .ok_or_else(|| WebhookRejection::UnknownPath(path.to_owned()))?;

        if req.method() != Method::POST {
            return Err(WebhookRejection::MethodNotAllowed(req.method().clone()));
        }

        let signature = header_value(req.headers(), SIGNATURE_HEADER);
        let timestamp = header_value(req.headers(), TIMESTAMP_HEADER);
        let body = Bytes::from_request(req, state).await?;

        Ok(WebhookRequest {
            application,
            signature,
            timestamp,
            body,
        })
    }
}

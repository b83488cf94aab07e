//! The webhook endpoint.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use evhook_core::{DispatchOutcome, RejectReason};

use crate::api::extractors::WebhookRequest;
use crate::state::AppState;

/// Body sent with every signature refusal.
pub const INVALID_SIGNATURE_BODY: &str = "invalid request signature";

/// `POST <application path>`: verify, classify and dispatch one webhook.
///
/// Answers as soon as the handler is scheduled; handler completion is never
/// awaited.
pub async fn receive(State(state): State<AppState>, request: WebhookRequest) -> WebhookResponse {
    let outcome = state
        .dispatcher
        .dispatch(&request.application, request.as_incoming());
    WebhookResponse(outcome)
}

/// HTTP rendering of a [`DispatchOutcome`].
#[derive(Debug)]
pub struct WebhookResponse(pub DispatchOutcome);

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        match self.0 {
            DispatchOutcome::Handshake => (
                StatusCode::NO_CONTENT,
                [(header::CONTENT_TYPE, "application/json")],
            )
                .into_response(),
            DispatchOutcome::Dispatched(_) | DispatchOutcome::Ignored(_) => {
                StatusCode::NO_CONTENT.into_response()
            }
            DispatchOutcome::Rejected(
                RejectReason::MissingSignature | RejectReason::SignatureInvalid,
            ) => (StatusCode::UNAUTHORIZED, INVALID_SIGNATURE_BODY).into_response(),
            DispatchOutcome::Rejected(RejectReason::MalformedPayload(_)) => {
                (StatusCode::BAD_REQUEST, "malformed request body").into_response()
            }
        }
    }
}

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![forbid(unsafe_code)]

//! Verification and dispatch engine for platform webhook events.
//!
//! # Request Flow
//!
//! 1. The listener looks up the [`Application`] for the request path in an
//!    [`ApplicationRegistry`]
//! 2. [`Dispatcher`] verifies the Ed25519 signature over `timestamp || body`
//! 3. [`decoder::decode`] classifies the body as a handshake or an event
//! 4. For an event, the registered handler is spawned on its own task
//!
//! Every request ends in a [`DispatchOutcome`] that maps onto an HTTP
//! status. Protocol failures never reach handler code.

pub mod application;
pub mod decoder;
pub mod processors;

pub use application::{
    Application, ApplicationError, ApplicationRegistry, EventHandler, RegistryError, TypedHandler,
};
pub use processors::{DispatchOutcome, Dispatcher, IgnoreReason, IncomingRequest, RejectReason};

//! Request processors.
//!
//! - `Dispatcher`: verifies, classifies and routes one webhook request,
//!   spawning the matching handler

pub mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher, IgnoreReason, IncomingRequest, RejectReason};

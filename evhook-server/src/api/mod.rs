//! HTTP surface of the listener.
//!
//! There is a single catch-all endpoint: every registered application
//! path accepts `POST` with a signed webhook body.

pub mod extractors;
pub mod webhook;

//! Wire-level types for platform webhook events.
//!
//! - [`signature`]: Ed25519 request verification and header names.
//! - [`objects`]: the request envelope and the event catalog.

pub mod objects;
pub mod signature;

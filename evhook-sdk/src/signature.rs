//! Signature algorithm and verification for incoming webhook requests.
//!
//! Every webhook request sent by the platform carries two headers:
//!
//! ```text
//! X-Signature-Ed25519:   {hex_signature}
//! X-Signature-Timestamp: {timestamp}
//! ```
//!
//! The signature is `Ed25519("{timestamp}{raw_body}", application_key)`,
//! where the timestamp is used verbatim as the header string and the body
//! is the exact byte sequence received.
//!
//! Verification failure is an expected outcome, so [`verify`] and friends
//! return `bool` and never error on malformed keys or signatures.

use ring::signature::{ED25519, Ed25519KeyPair, UnparsedPublicKey};
use std::fmt;

/// Header name carrying the hex-encoded Ed25519 signature.
pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";

/// Header name carrying the signed timestamp string.
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Length of a raw Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a raw Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Errors produced while parsing key material.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid public key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}

// ---------------------------------------------------------------------------
// VerifyKey
// ---------------------------------------------------------------------------

/// An application's public verification key.
///
/// Holds raw key bytes. Keys built from bytes are not length-checked; a
/// malformed key simply fails every verification.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyKey(Box<[u8]>);

impl VerifyKey {
    /// Parse a hex-encoded 32-byte public key, as shown on the developer
    /// portal.
    pub fn from_hex(value: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(value.trim())?;
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(SignatureError::InvalidKeyLength(bytes.len()));
        }
        Ok(Self(bytes.into_boxed_slice()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Verify a raw signature over `timestamp || body`.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature: &[u8]) -> bool {
        verify(&self.0, timestamp, body, signature)
    }

    /// Verify a hex-encoded signature, as carried in [`SIGNATURE_HEADER`].
    pub fn verify_hex(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
        verify_hex_signature(&self.0, timestamp, body, signature_hex)
    }
}

impl fmt::Debug for VerifyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VerifyKey").field(&hex::encode(&self.0)).finish()
    }
}

impl From<[u8; PUBLIC_KEY_LEN]> for VerifyKey {
    fn from(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }
}

impl From<Vec<u8>> for VerifyKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

impl From<&[u8]> for VerifyKey {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify `signature` over `timestamp || body` with an Ed25519 public key.
///
/// Returns `false` for a wrong signature as well as for a key or signature
/// of the wrong length.
pub fn verify(public_key: &[u8], timestamp: &str, body: &[u8], signature: &[u8]) -> bool {
    let message = signed_message(timestamp, body);
    UnparsedPublicKey::new(&ED25519, public_key)
        .verify(&message, signature)
        .is_ok()
}

/// Like [`verify`], but takes the signature as a hex string.
pub fn verify_hex_signature(
    public_key: &[u8],
    timestamp: &str,
    body: &[u8],
    signature_hex: &str,
) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    verify(public_key, timestamp, body, &signature)
}

/// Sign a request the way the platform does, returning the hex value for
/// [`SIGNATURE_HEADER`].
///
/// Useful for replaying captured payloads against a local listener.
pub fn sign_request(key_pair: &Ed25519KeyPair, timestamp: &str, body: &[u8]) -> String {
    let message = signed_message(timestamp, body);
    hex::encode(key_pair.sign(&message))
}

fn signed_message(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    message
}

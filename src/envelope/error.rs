use thiserror::Error;

use crate::handshake::HandshakeError;

/// Errors raised by the encrypted envelope codec.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The AES-256-GCM tag check rejected the ciphertext: wrong key or
    /// tampered data. No partial plaintext is ever returned.
    #[error("envelope authentication failed: ciphertext rejected by AES-256-GCM tag check")]
    Authentication,

    /// A wire field could not be decoded.
    #[error("invalid envelope field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The cipher could not be constructed or encryption itself failed.
    #[error("envelope encryption failed: {0}")]
    Encryption(String),

    /// Session-key derivation against the envelope's public key failed.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

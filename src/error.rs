//! Top-level error type composing the per-stage errors.
//!
//! Every error is terminal for the operation that raised it — nothing is
//! silently retried inside this crate. A failed `connect` leaves the
//! client uninitialized and retryable; a failed `call_encrypted` leaves
//! session state intact.

use thiserror::Error;

use crate::attestation::DecodeError;
use crate::envelope::EnvelopeError;
use crate::handshake::HandshakeError;
use crate::keys::CurveDetectionError;
use crate::session::TransportError;

/// Anything the secure channel can fail with.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    CurveDetection(#[from] CurveDetectionError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session not established: call connect() first")]
    NotConnected,
}

impl ChannelError {
    /// True when this is an AEAD tag mismatch — tampered or mis-keyed
    /// ciphertext, as opposed to a transport or encoding failure.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ChannelError::Envelope(EnvelopeError::Authentication))
    }
}

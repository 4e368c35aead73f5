// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use thiserror::Error;

/// Errors that are fatal to a handshake attempt.
///
/// No partial or degraded session is ever returned: a failed handshake
/// leaves the engine exactly where it was, and every variant names the
/// stage that failed so interoperability breaks can be diagnosed from the
/// error alone.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer's key is on a different curve than this session, or on no
    /// supported curve at all.
    #[error("unsupported curve for handshake: {0}")]
    UnsupportedCurve(String),

    /// The peer's public key failed conversion or point validation.
    ///
    /// Mandatory check: a malformed or adversarial peer key must never
    /// silently produce an insecure or all-zero shared secret.
    #[error("invalid peer key at {stage}: {reason}")]
    InvalidPeerKey { stage: &'static str, reason: String },

    /// A cryptographic primitive failed during derivation.
    #[error("key derivation failed at {stage}: {reason}")]
    Derivation { stage: &'static str, reason: String },

    /// The engine was asked to do something its current state does not
    /// allow (e.g. establishing a session before keys were generated).
    #[error("handshake state '{state}' does not allow {operation}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

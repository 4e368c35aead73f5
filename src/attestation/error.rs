// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use thiserror::Error;

use crate::keys::CurveDetectionError;

/// Errors raised while decoding an attestation envelope or its payload.
///
/// Every variant names the stage or field that failed: when an enclave
/// firmware update changes a field encoding, the break must be diagnosable
/// from the error alone.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The outer signed envelope could not be decoded.
    #[error("attestation envelope decode failed at {stage}: {reason}")]
    Envelope { stage: &'static str, reason: String },

    /// The payload is not a CBOR map.
    #[error("attestation payload undecodable: {reason}")]
    Payload { reason: String },

    /// A payload field was present but malformed, or a required field was
    /// missing.
    #[error("attestation field '{field}' invalid: {reason}")]
    Field { field: &'static str, reason: String },

    /// The document carries no public key, or an empty one — nothing to
    /// hand to the handshake.
    #[error("attestation document carries no public key")]
    MissingPublicKey,

    /// The embedded public key could not be converted to wrapped form.
    #[error("attestation public key conversion failed: {0}")]
    Key(#[from] CurveDetectionError),
}

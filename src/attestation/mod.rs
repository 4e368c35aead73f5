// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Attestation Document Decoding
//!
//! Decodes the hardware attestation structure an enclave returns when asked
//! to prove its identity:
//!
//! - **Envelope**: a COSE_Sign1-style 4-element CBOR array
//!   `[protected, unprotected, payload, signature]`
//! - **Document**: the payload, a CBOR map carrying module identity, PCR
//!   measurements, the certificate chain and the enclave's session public
//!   key
//!
//! ## Trust
//!
//! This module extracts fields; it does **not** verify them. Certificate
//! chain validation against a trusted root set and PCR comparison against
//! an expected manifest belong to a verification policy layered above this
//! decoder — everything needed for that (headers, signature, certificate,
//! CA bundle) is surfaced untouched.

pub mod document;
pub mod envelope;
pub mod error;

pub use document::{decode_document, AttestationDocument};
pub use envelope::{decode_envelope, SignedEnvelope};
pub use error::DecodeError;

/// Decode a raw attestation response into the document plus the envelope
/// it arrived in.
pub fn decode_attestation(bytes: &[u8]) -> Result<(AttestationDocument, SignedEnvelope), DecodeError> {
    let envelope = decode_envelope(bytes)?;
    let document = decode_document(&envelope.payload)?;
    Ok((document, envelope))
}

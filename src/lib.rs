// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Attested secure channel client for TEE enclave services.
//!
//! Every enclave-backed service repeats the same handshake: fetch and
//! decode a hardware attestation document, establish a shared secret with
//! the enclave via ECDH (no pre-shared key), then exchange AES-256-GCM
//! envelopes that are opaque outside the enclave. This crate is that
//! subsystem, consolidated:
//!
//! - [`attestation`] — COSE_Sign1-style envelope + CBOR payload decoding
//! - [`keys`] — raw ⇄ wrapped (SPKI) key conversion and curve detection
//! - [`handshake`] — dual-curve ECDH (P-384, secp256k1) + HKDF-SHA256
//! - [`envelope`] — the `{nonce, public_key, data}` encrypted wire format
//! - [`session`] — the `connect` / `call` / `call_encrypted` facade
//!
//! Attestation **trust** (certificate chain, PCR manifest, signature) is
//! deliberately out of scope: the decoder surfaces everything a policy
//! layer needs, and verifies nothing.

pub mod attestation;
pub mod envelope;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod session;

// Re-export main types from the protocol modules
pub use attestation::{decode_attestation, AttestationDocument, DecodeError, SignedEnvelope};
pub use envelope::{EncryptedEnvelope, EnvelopeError, KeyMode};
pub use error::ChannelError;
pub use handshake::{
    curve_ops, derive_for_peer, derive_session_key, CurveOps, HandshakeEngine, HandshakeError,
    HandshakeState, KeyPair, SessionKey,
};
pub use keys::{detect_curve, to_raw, to_wrapped, CurveDetectionError, CurveIdentity};
pub use session::{
    HttpTransport, Method, SessionClient, SessionConfig, Transport, TransportError,
    TransportResponse,
};

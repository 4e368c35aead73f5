// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted Envelope Codec
//!
//! The wire format every encrypted request and response uses:
//!
//! ```json
//! { "nonce": "<hex, 32 bytes>", "public_key": "<hex, wrapped>", "data": "<hex ciphertext+tag>" }
//! ```
//!
//! ## Nonce truncation
//!
//! The wire carries a 32-byte random nonce but **only its first 12 bytes
//! are the AES-256-GCM IV**. This matches the peer's nonce convention and
//! must be reproduced exactly — a "fixed" 12-byte wire nonce does not
//! interoperate. The IV is still a uniformly random 12-byte value, so
//! entropy is not actually reduced; it just looks that way on the wire.
//!
//! ## Key reuse
//!
//! Deployed call sites re-run the handshake for every message (a fresh
//! ephemeral keypair per `encrypt`). [`KeyMode`] makes that an explicit
//! choice instead of an accident of history: `PerMessage` matches the
//! deployed behavior, `PerConnection` reuses the connect-time keypair so
//! the same session key is re-derived per request without fresh keygen.

pub mod codec;
pub mod error;

pub use codec::{decrypt, encrypt, EncryptedEnvelope, GCM_IV_LEN, WIRE_NONCE_LEN};
pub use error::EnvelopeError;

/// How ephemeral key material is scoped across encrypted calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// A fresh ephemeral keypair (and thus a fresh session key) for every
    /// message. Matches the deployed call sites.
    #[default]
    PerMessage,
    /// Reuse the connect-time ephemeral keypair for the whole connection.
    PerConnection,
}

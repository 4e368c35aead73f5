// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Handshake Engine
//!
//! Establishes a shared 256-bit session key with an enclave peer without any
//! pre-shared secret:
//!
//! 1. Generate an ephemeral keypair on the peer's curve
//! 2. Validate the peer's public point and compute the ECDH shared secret
//! 3. Expand the shared secret with HKDF-SHA256 into the session key
//!
//! The KDF parameters (empty salt, info string `"encryption data"`) are fixed
//! by the enclave side of the protocol. Changing them breaks the handshake
//! against every deployed enclave, so they are module constants here rather
//! than configuration.
//!
//! Curve dispatch goes through the [`CurveOps`] trait, implemented once per
//! curve — there is a single polymorphic boundary instead of per-call-site
//! curve branches.

pub mod curves;
pub mod engine;
pub mod error;

pub use curves::{curve_ops, CurveOps, KeyPair, SessionKey};
pub use engine::{derive_for_peer, derive_session_key, HandshakeEngine, HandshakeState, ENCRYPTION_INFO};
pub use error::HandshakeError;

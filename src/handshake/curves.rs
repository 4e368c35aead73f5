// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-curve ECDH primitives behind a single dispatch trait.

use rand::rngs::OsRng;

use crate::keys::CurveIdentity;

use super::error::HandshakeError;

/// An ephemeral keypair bound to one curve for the lifetime of a session.
///
/// The private scalar is never serialized outward and is redacted from
/// `Debug` output; the public point is the SEC1 uncompressed encoding.
/// Keypairs are replaced wholesale on reconnect, never mutated.
#[derive(Clone)]
pub struct KeyPair {
    curve: CurveIdentity,
    private_scalar: Vec<u8>,
    public_point: Vec<u8>,
}

impl KeyPair {
    pub fn curve(&self) -> CurveIdentity {
        self.curve
    }

    /// Raw SEC1 uncompressed public point.
    pub fn public_point(&self) -> &[u8] {
        &self.public_point
    }

    /// Public point in wrapped (SPKI) form, as transmitted on the wire.
    pub fn public_wrapped(&self) -> Vec<u8> {
        let mut wrapped = Vec::with_capacity(self.curve.wrapped_len());
        wrapped.extend_from_slice(self.curve.spki_header());
        wrapped.extend_from_slice(&self.public_point);
        wrapped
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("curve", &self.curve)
            .field("private_scalar", &"<redacted>")
            .field("public_point_len", &self.public_point.len())
            .finish()
    }
}

/// A derived 256-bit session key.
///
/// Never persisted, never logged: `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// The per-curve primitive set the handshake dispatches through.
///
/// Implemented exactly once per supported curve; everything above this
/// trait is curve-agnostic.
pub trait CurveOps: Send + Sync {
    fn curve(&self) -> CurveIdentity;

    /// Generate a fresh ephemeral keypair.
    fn generate_keypair(&self) -> Result<KeyPair, HandshakeError>;

    /// Check that a raw SEC1 point lies on the curve.
    fn validate_point(&self, raw_point: &[u8]) -> Result<(), HandshakeError>;

    /// Compute the ECDH shared secret between our scalar and the peer's
    /// validated raw point.
    fn derive_shared_secret(
        &self,
        keypair: &KeyPair,
        peer_raw_point: &[u8],
    ) -> Result<Vec<u8>, HandshakeError>;
}

/// Look up the primitive set for a curve.
pub fn curve_ops(curve: CurveIdentity) -> &'static dyn CurveOps {
    match curve {
        CurveIdentity::P384 => &P384Ops,
        CurveIdentity::Secp256k1 => &Secp256k1Ops,
    }
}

/// NIST P-384 via the curve's native ECDH.
pub struct P384Ops;

impl CurveOps for P384Ops {
    fn curve(&self) -> CurveIdentity {
        CurveIdentity::P384
    }

    fn generate_keypair(&self) -> Result<KeyPair, HandshakeError> {
        use p384::elliptic_curve::sec1::ToEncodedPoint;

        let secret = p384::SecretKey::random(&mut OsRng);
        let public = secret.public_key();

        Ok(KeyPair {
            curve: CurveIdentity::P384,
            private_scalar: secret.to_bytes().to_vec(),
            public_point: public.to_encoded_point(false).as_bytes().to_vec(),
        })
    }

    fn validate_point(&self, raw_point: &[u8]) -> Result<(), HandshakeError> {
        p384::PublicKey::from_sec1_bytes(raw_point)
            .map(|_| ())
            .map_err(|e| HandshakeError::InvalidPeerKey {
                stage: "P-384 point validation",
                reason: e.to_string(),
            })
    }

    fn derive_shared_secret(
        &self,
        keypair: &KeyPair,
        peer_raw_point: &[u8],
    ) -> Result<Vec<u8>, HandshakeError> {
        use p384::elliptic_curve::ecdh::diffie_hellman;

        let secret = p384::SecretKey::from_slice(&keypair.private_scalar).map_err(|e| {
            HandshakeError::Derivation {
                stage: "P-384 scalar decode",
                reason: e.to_string(),
            }
        })?;
        let public = p384::PublicKey::from_sec1_bytes(peer_raw_point).map_err(|e| {
            HandshakeError::InvalidPeerKey {
                stage: "P-384 point decode",
                reason: e.to_string(),
            }
        })?;

        let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
        Ok(shared.raw_secret_bytes().to_vec())
    }
}

/// secp256k1 — X-only shared coordinate, matching the Ethereum-side
/// convention the platform uses for this curve.
pub struct Secp256k1Ops;

impl CurveOps for Secp256k1Ops {
    fn curve(&self) -> CurveIdentity {
        CurveIdentity::Secp256k1
    }

    fn generate_keypair(&self) -> Result<KeyPair, HandshakeError> {
        use k256::elliptic_curve::sec1::ToEncodedPoint;

        let secret = k256::SecretKey::random(&mut OsRng);
        let public = secret.public_key();

        Ok(KeyPair {
            curve: CurveIdentity::Secp256k1,
            private_scalar: secret.to_bytes().to_vec(),
            public_point: public.to_encoded_point(false).as_bytes().to_vec(),
        })
    }

    fn validate_point(&self, raw_point: &[u8]) -> Result<(), HandshakeError> {
        k256::PublicKey::from_sec1_bytes(raw_point)
            .map(|_| ())
            .map_err(|e| HandshakeError::InvalidPeerKey {
                stage: "secp256k1 point validation",
                reason: e.to_string(),
            })
    }

    fn derive_shared_secret(
        &self,
        keypair: &KeyPair,
        peer_raw_point: &[u8],
    ) -> Result<Vec<u8>, HandshakeError> {
        use k256::elliptic_curve::ecdh::diffie_hellman;

        let secret = k256::SecretKey::from_slice(&keypair.private_scalar).map_err(|e| {
            HandshakeError::Derivation {
                stage: "secp256k1 scalar decode",
                reason: e.to_string(),
            }
        })?;
        let public = k256::PublicKey::from_sec1_bytes(peer_raw_point).map_err(|e| {
            HandshakeError::InvalidPeerKey {
                stage: "secp256k1 point decode",
                reason: e.to_string(),
            }
        })?;

        // raw_secret_bytes() of the RustCrypto shared secret is exactly the
        // X coordinate of scalar * peer_point (32 bytes).
        let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
        Ok(shared.raw_secret_bytes().to_vec())
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Curve identity and detection.

use tracing::warn;

use super::error::CurveDetectionError;

/// DER SubjectPublicKeyInfo header for a P-384 uncompressed point.
///
/// SEQUENCE { SEQUENCE { OID id-ecPublicKey, OID secp384r1 }, BIT STRING }
/// — 23 bytes, followed directly by the 97-byte raw point.
pub const P384_SPKI_HEADER: [u8; 23] = [
    0x30, 0x76, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05,
    0x2b, 0x81, 0x04, 0x00, 0x22, 0x03, 0x62, 0x00,
];

/// DER SubjectPublicKeyInfo header for a secp256k1 uncompressed point.
pub const SECP256K1_SPKI_HEADER: [u8; 23] = [
    0x30, 0x56, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05,
    0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x42, 0x00,
];

// Curve OID encodings (`06 05 2b 81 04 00 xx`), searched for inside keys of
// unknown form before any length heuristic runs.
const P384_OID: [u8; 7] = [0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x22];
const SECP256K1_OID: [u8; 7] = [0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a];

/// The two curves deployed by the enclave platform.
///
/// Every key and every derived secret belongs to exactly one curve for the
/// lifetime of a session; a session never mixes curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveIdentity {
    /// NIST P-384 (secp384r1) — the enclave encryption keypair.
    P384,
    /// secp256k1 — the Ethereum-compatible keypair some deployments use.
    Secp256k1,
}

impl CurveIdentity {
    /// Length of the SEC1 uncompressed point (`0x04 || X || Y`).
    pub fn raw_len(&self) -> usize {
        match self {
            CurveIdentity::P384 => 97,
            CurveIdentity::Secp256k1 => 65,
        }
    }

    /// Length of the DER SubjectPublicKeyInfo encoding.
    pub fn wrapped_len(&self) -> usize {
        match self {
            CurveIdentity::P384 => 120,
            CurveIdentity::Secp256k1 => 88,
        }
    }

    /// The fixed 23-byte SPKI header preceding the raw point.
    pub fn spki_header(&self) -> &'static [u8] {
        match self {
            CurveIdentity::P384 => &P384_SPKI_HEADER,
            CurveIdentity::Secp256k1 => &SECP256K1_SPKI_HEADER,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CurveIdentity::P384 => "P-384",
            CurveIdentity::Secp256k1 => "secp256k1",
        }
    }
}

impl std::fmt::Display for CurveIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Detect which curve a public key belongs to.
///
/// Detection order:
/// 1. Search for either curve's OID byte sequence inside the key (present
///    in wrapped-form keys).
/// 2. Exact-length match against the four known encodings
///    (97/120 for P-384, 65/88 for secp256k1).
/// 3. Length heuristic: longer than 160 hex characters (80 bytes) is
///    treated as P-384, anything else as secp256k1.
///
/// Step 3 exists because some call sites receive a key whose encoding form
/// is not reliably known in advance. Reaching it is a contract violation on
/// the peer's side and is logged at `warn` level — a misdetected curve
/// corrupts every derived key silently.
pub fn detect_curve(key: &[u8]) -> Result<CurveIdentity, CurveDetectionError> {
    if key.is_empty() {
        return Err(CurveDetectionError::Empty);
    }

    // 1. Algorithm-identifier OID search
    if contains_subsequence(key, &P384_OID) {
        return Ok(CurveIdentity::P384);
    }
    if contains_subsequence(key, &SECP256K1_OID) {
        return Ok(CurveIdentity::Secp256k1);
    }

    // 2. Exact length match
    match key.len() {
        97 | 120 => return Ok(CurveIdentity::P384),
        65 | 88 => return Ok(CurveIdentity::Secp256k1),
        _ => {}
    }

    // 3. Length heuristic over the hex representation
    let curve = if key.len() * 2 > 160 {
        CurveIdentity::P384
    } else {
        CurveIdentity::Secp256k1
    };
    warn!(
        length = key.len(),
        curve = curve.name(),
        "ambiguous public key encoding, defaulting curve by length heuristic"
    );
    Ok(curve)
}

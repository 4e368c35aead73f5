// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Raw point ⇄ wrapped (SPKI) conversion.

use super::curve::{detect_curve, CurveIdentity};
use super::error::CurveDetectionError;

/// Convert a public key to its wrapped (DER SubjectPublicKeyInfo) form.
///
/// A key that is already wrapped passes through unchanged, so repeated
/// application is a no-op.
pub fn to_wrapped(key: &[u8]) -> Result<Vec<u8>, CurveDetectionError> {
    let curve = detect_curve(key)?;

    if key.len() == curve.wrapped_len() {
        return Ok(key.to_vec());
    }

    if key.len() == curve.raw_len() {
        let mut wrapped = Vec::with_capacity(curve.wrapped_len());
        wrapped.extend_from_slice(curve.spki_header());
        wrapped.extend_from_slice(key);
        return Ok(wrapped);
    }

    Err(CurveDetectionError::UnknownEncoding {
        curve: curve.name(),
        length: key.len(),
    })
}

/// Convert a public key to its raw SEC1 uncompressed form.
///
/// A key that is already raw passes through unchanged. Wrapped keys are
/// checked against the curve's SPKI header before the point is extracted:
/// a wrapped-length key with a foreign header is reported rather than
/// silently sliced, since that would hand an off-curve blob to ECDH.
pub fn to_raw(key: &[u8]) -> Result<Vec<u8>, CurveDetectionError> {
    let curve = detect_curve(key)?;

    if key.len() == curve.raw_len() {
        return Ok(key.to_vec());
    }

    if key.len() == curve.wrapped_len() {
        let header = curve.spki_header();
        if !key.starts_with(header) {
            return Err(CurveDetectionError::MalformedWrapped {
                curve: curve.name(),
                reason: format!(
                    "expected SPKI header {}, got {}",
                    hex::encode(header),
                    hex::encode(&key[..header.len().min(key.len())])
                ),
            });
        }
        return Ok(key[header.len()..].to_vec());
    }

    Err(CurveDetectionError::UnknownEncoding {
        curve: curve.name(),
        length: key.len(),
    })
}

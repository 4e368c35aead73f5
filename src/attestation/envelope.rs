// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Outer signed-envelope decoding.
//!
//! Attestation documents arrive as a COSE_Sign1-style structure: a CBOR
//! array of `[protected, unprotected, payload, signature]`. The signature
//! is extracted and surfaced but not verified here — trust establishment
//! (certificate chain, PCR manifest) is a policy layer above this decoder.

use serde_cbor::Value;

use super::error::DecodeError;

/// The decoded outer envelope.
///
/// `payload` still needs a second CBOR decode to yield the attestation
/// document; headers and signature are kept raw for any verification layer
/// built on top.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    /// Protected header, nested-decoded when it arrived as a byte string.
    pub protected: Value,
    /// Unprotected header, passed through as decoded.
    pub unprotected: Value,
    /// The still-encoded attestation document.
    pub payload: Vec<u8>,
    /// Raw signature bytes, when the envelope carried one.
    pub signature: Option<Vec<u8>>,
}

/// Decode the outer envelope from raw bytes.
///
/// A 3- or 4-element CBOR array is treated as the signed envelope. Anything
/// else is treated as the payload itself — some endpoints respond with the
/// bare document and no signature wrapper.
pub fn decode_envelope(bytes: &[u8]) -> Result<SignedEnvelope, DecodeError> {
    let outer: Value = serde_cbor::from_slice(bytes).map_err(|e| DecodeError::Envelope {
        stage: "outer structure",
        reason: e.to_string(),
    })?;

    match outer {
        Value::Array(elements) if elements.len() >= 3 => {
            let mut elements = elements.into_iter();
            let protected = decode_protected(elements.next().unwrap_or(Value::Null));
            let unprotected = elements.next().unwrap_or(Value::Null);

            let payload = match elements.next() {
                Some(Value::Bytes(bytes)) => bytes,
                Some(other) => {
                    return Err(DecodeError::Envelope {
                        stage: "payload element",
                        reason: format!("expected byte string, got {}", value_kind(&other)),
                    })
                }
                None => {
                    return Err(DecodeError::Envelope {
                        stage: "payload element",
                        reason: "envelope has no payload element".to_string(),
                    })
                }
            };

            let signature = match elements.next() {
                Some(Value::Bytes(bytes)) => Some(bytes),
                Some(other) => {
                    return Err(DecodeError::Envelope {
                        stage: "signature element",
                        reason: format!("expected byte string, got {}", value_kind(&other)),
                    })
                }
                None => None,
            };

            Ok(SignedEnvelope {
                protected,
                unprotected,
                payload,
                signature,
            })
        }

        // Fallback: non-enveloped response, the whole value is the payload.
        Value::Bytes(bytes) => Ok(SignedEnvelope {
            protected: Value::Null,
            unprotected: Value::Null,
            payload: bytes,
            signature: None,
        }),
        other => {
            let payload = serde_cbor::to_vec(&other).map_err(|e| DecodeError::Envelope {
                stage: "payload re-encode",
                reason: e.to_string(),
            })?;
            Ok(SignedEnvelope {
                protected: Value::Null,
                unprotected: Value::Null,
                payload,
                signature: None,
            })
        }
    }
}

/// The protected header is itself CBOR-encoded when transported as bytes.
/// An undecodable header is kept raw rather than failing the envelope —
/// it is diagnostic data, not something this layer interprets.
fn decode_protected(value: Value) -> Value {
    match value {
        Value::Bytes(bytes) if !bytes.is_empty() => {
            serde_cbor::from_slice(&bytes).unwrap_or(Value::Bytes(bytes))
        }
        other => other,
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::Text(_) => "text",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "other",
    }
}

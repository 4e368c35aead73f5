//! Attestation payload decoding.
//!
//! The envelope payload is a CBOR map keyed by short strings or small
//! integers, depending on the enclave firmware revision. Every field is
//! looked up under both keys, string form preferred.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_cbor::Value;

use crate::keys::to_wrapped;

use super::envelope::value_kind;
use super::error::DecodeError;

/// A decoded attestation document.
///
/// Immutable once decoded and owned by the caller for a single connection
/// attempt — enclaves may rotate their ephemeral key, so documents are
/// never cached across handshakes.
#[derive(Debug, Clone)]
pub struct AttestationDocument {
    /// Enclave module identifier (e.g. `i-0abc...-enc0123`).
    pub module_id: String,
    /// Timestamp as carried in the document. Firmware revisions disagree on
    /// the unit (epoch seconds vs milliseconds); see [`Self::timestamp_ms`].
    pub timestamp: u64,
    /// Digest algorithm name, when present (e.g. `SHA384`).
    pub digest: Option<String>,
    /// PCR measurements, index → lowercase hex.
    pub pcrs: BTreeMap<String, String>,
    /// Leaf certificate, PEM-wrapped for human/tool consumption.
    pub certificate: Option<String>,
    /// CA bundle entries, each PEM-wrapped, order preserved.
    pub cabundle: Vec<String>,
    /// The enclave's session public key, hex of the wrapped (SPKI) form —
    /// uniform regardless of how the enclave emitted it.
    pub public_key: String,
    /// User data as text when printable, lowercase hex otherwise.
    pub user_data: Option<String>,
    /// `user_data` parsed as JSON, when it is JSON (deployments embed an
    /// address object here).
    pub user_data_json: Option<serde_json::Value>,
    /// Attestation nonce as text when printable, lowercase hex otherwise.
    pub nonce: Option<String>,
}

impl AttestationDocument {
    /// Timestamp normalized to epoch milliseconds.
    ///
    /// Values below 10^12 are epoch seconds (some firmware emits seconds,
    /// some milliseconds) and are scaled up.
    pub fn timestamp_ms(&self) -> u64 {
        if self.timestamp < 1_000_000_000_000 {
            self.timestamp.saturating_mul(1000)
        } else {
            self.timestamp
        }
    }
}

// Integer field IDs used by firmware that keys the payload map with small
// integers instead of strings, in document field order.
const ID_MODULE_ID: i128 = 1;
const ID_DIGEST: i128 = 2;
const ID_TIMESTAMP: i128 = 3;
const ID_PCRS: i128 = 4;
const ID_CERTIFICATE: i128 = 5;
const ID_CABUNDLE: i128 = 6;
const ID_PUBLIC_KEY: i128 = 7;
const ID_USER_DATA: i128 = 8;
const ID_NONCE: i128 = 9;

/// Decode the payload map into an [`AttestationDocument`].
pub fn decode_document(payload: &[u8]) -> Result<AttestationDocument, DecodeError> {
    let value: Value = serde_cbor::from_slice(payload).map_err(|e| DecodeError::Payload {
        reason: e.to_string(),
    })?;
    let map = match value {
        Value::Map(map) => map,
        other => {
            return Err(DecodeError::Payload {
                reason: format!("expected map, got {}", value_kind(&other)),
            })
        }
    };

    let module_id = match field(&map, "module_id", ID_MODULE_ID) {
        Some(Value::Text(text)) => text.clone(),
        Some(Value::Bytes(bytes)) => classify_bytes(bytes),
        Some(other) => {
            return Err(DecodeError::Field {
                field: "module_id",
                reason: format!("expected text, got {}", value_kind(other)),
            })
        }
        None => {
            return Err(DecodeError::Field {
                field: "module_id",
                reason: "missing".to_string(),
            })
        }
    };

    let timestamp = match field(&map, "timestamp", ID_TIMESTAMP) {
        Some(Value::Integer(ts)) if *ts >= 0 => *ts as u64,
        Some(other) => {
            return Err(DecodeError::Field {
                field: "timestamp",
                reason: format!("expected non-negative integer, got {}", value_kind(other)),
            })
        }
        None => {
            return Err(DecodeError::Field {
                field: "timestamp",
                reason: "missing".to_string(),
            })
        }
    };

    let digest = match field(&map, "digest", ID_DIGEST) {
        Some(Value::Text(text)) => Some(text.clone()),
        Some(Value::Bytes(bytes)) => Some(classify_bytes(bytes)),
        _ => None,
    };

    let pcrs = decode_pcrs(&map)?;

    let certificate = match field(&map, "certificate", ID_CERTIFICATE) {
        Some(value) => Some(decode_pem_field("certificate", value)?),
        None => None,
    };

    let cabundle = match field(&map, "cabundle", ID_CABUNDLE) {
        Some(Value::Array(entries)) => {
            let mut bundle = Vec::with_capacity(entries.len());
            for entry in entries {
                bundle.push(decode_pem_field("cabundle", entry)?);
            }
            bundle
        }
        Some(other) => {
            return Err(DecodeError::Field {
                field: "cabundle",
                reason: format!("expected array, got {}", value_kind(other)),
            })
        }
        None => Vec::new(),
    };

    let public_key = decode_public_key(&map)?;

    let (user_data, user_data_json) = match field(&map, "user_data", ID_USER_DATA) {
        Some(Value::Bytes(bytes)) if !bytes.is_empty() => {
            let text = classify_bytes(bytes);
            let json = serde_json::from_slice(bytes).ok();
            (Some(text), json)
        }
        Some(Value::Text(text)) if !text.is_empty() => {
            let json = serde_json::from_str(text).ok();
            (Some(text.clone()), json)
        }
        _ => (None, None),
    };

    let nonce = match field(&map, "nonce", ID_NONCE) {
        Some(Value::Bytes(bytes)) if !bytes.is_empty() => Some(classify_bytes(bytes)),
        Some(Value::Text(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    };

    Ok(AttestationDocument {
        module_id,
        timestamp,
        digest,
        pcrs,
        certificate,
        cabundle,
        public_key,
        user_data,
        user_data_json,
        nonce,
    })
}

/// Look a field up by string name and by integer ID, preferring the string.
fn field<'a>(map: &'a BTreeMap<Value, Value>, name: &str, id: i128) -> Option<&'a Value> {
    map.get(&Value::Text(name.to_string()))
        .or_else(|| map.get(&Value::Integer(id)))
}

fn decode_pcrs(map: &BTreeMap<Value, Value>) -> Result<BTreeMap<String, String>, DecodeError> {
    let entries = match field(map, "pcrs", ID_PCRS) {
        Some(Value::Map(entries)) => entries,
        Some(other) => {
            return Err(DecodeError::Field {
                field: "pcrs",
                reason: format!("expected map, got {}", value_kind(other)),
            })
        }
        None => return Ok(BTreeMap::new()),
    };

    let mut pcrs = BTreeMap::new();
    for (key, value) in entries {
        let index = match key {
            Value::Integer(index) => index.to_string(),
            Value::Text(text) => text.clone(),
            other => {
                return Err(DecodeError::Field {
                    field: "pcrs",
                    reason: format!("PCR index must be integer or text, got {}", value_kind(other)),
                })
            }
        };
        // PCR values are always surfaced as lowercase hex, printable or not.
        let measurement = match value {
            Value::Bytes(bytes) => hex::encode(bytes),
            Value::Text(text) => text.to_lowercase(),
            other => {
                return Err(DecodeError::Field {
                    field: "pcrs",
                    reason: format!("PCR value must be bytes, got {}", value_kind(other)),
                })
            }
        };
        pcrs.insert(index, measurement);
    }
    Ok(pcrs)
}

fn decode_public_key(map: &BTreeMap<Value, Value>) -> Result<String, DecodeError> {
    let bytes = match field(map, "public_key", ID_PUBLIC_KEY) {
        Some(Value::Bytes(bytes)) if !bytes.is_empty() => bytes.clone(),
        Some(Value::Text(text)) if !text.is_empty() => public_key_text_to_bytes(text)?,
        Some(_) | None => return Err(DecodeError::MissingPublicKey),
    };

    // Uniform key encoding for callers, whatever form the enclave emitted.
    let wrapped = to_wrapped(&bytes)?;
    Ok(hex::encode(wrapped))
}

/// Enclaves have shipped the key as raw bytes, as hex, and as a PEM block
/// injected into the document. Normalize all three to DER bytes.
fn public_key_text_to_bytes(text: &str) -> Result<Vec<u8>, DecodeError> {
    if text.contains("-----BEGIN") {
        let body: String = text
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect();
        return BASE64.decode(body.trim()).map_err(|e| DecodeError::Field {
            field: "public_key",
            reason: format!("PEM body is not valid base64: {e}"),
        });
    }

    let stripped = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(stripped).map_err(|e| DecodeError::Field {
        field: "public_key",
        reason: format!("expected PEM or hex text: {e}"),
    })
}

fn decode_pem_field(name: &'static str, value: &Value) -> Result<String, DecodeError> {
    match value {
        Value::Bytes(der) => Ok(pem_wrap(der)),
        Value::Text(text) if text.contains("-----BEGIN") => Ok(text.clone()),
        // Bare base64 body: reflow into a PEM block.
        Value::Text(text) => {
            let der = BASE64
                .decode(text.trim())
                .map_err(|e| DecodeError::Field {
                    field: name,
                    reason: format!("expected DER bytes, PEM or base64 text: {e}"),
                })?;
            Ok(pem_wrap(&der))
        }
        other => Err(DecodeError::Field {
            field: name,
            reason: format!("expected bytes or text, got {}", value_kind(other)),
        }),
    }
}

/// Wrap DER bytes as a PEM certificate block with a 64-column base64 body.
fn pem_wrap(der: &[u8]) -> String {
    let encoded = BASE64.encode(der);
    let mut pem = String::with_capacity(encoded.len() + 64);
    pem.push_str("-----BEGIN CERTIFICATE-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        // chunks of an ASCII string are valid UTF-8
        pem.push_str(std::str::from_utf8(chunk).unwrap_or(""));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----");
    pem
}

/// Printable-ASCII bytes (plus CR/LF/Tab) surface as text; everything else
/// as lowercase hex.
fn classify_bytes(bytes: &[u8]) -> String {
    if !bytes.is_empty() && bytes.iter().all(|&b| (0x20..=0x7e).contains(&b) || b == b'\r' || b == b'\n' || b == b'\t')
    {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        hex::encode(bytes)
    }
}

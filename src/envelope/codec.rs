//! AES-256-GCM envelope encryption and decryption.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::handshake::{derive_for_peer, KeyPair};

use super::error::EnvelopeError;

/// Random nonce bytes carried on the wire.
pub const WIRE_NONCE_LEN: usize = 32;

/// Bytes of the wire nonce actually used as the AES-GCM IV.
pub const GCM_IV_LEN: usize = 12;

/// One encrypted message on the wire. Single-use: a fresh nonce is
/// generated per encryption, and replay is the caller's concern.
///
/// Responses from older enclaves name the ciphertext field
/// `encrypted_data`; the alias keeps both spellings decodable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// 32 random bytes, hex. Only the first 12 are the AEAD IV.
    pub nonce: String,
    /// The sender's ephemeral public key, wrapped form, hex.
    pub public_key: String,
    /// Ciphertext plus 16-byte authentication tag, hex.
    #[serde(alias = "encrypted_data")]
    pub data: String,
}

/// Encrypt a plaintext to the peer, deriving the session key from
/// `keypair` and the peer's wrapped public key.
///
/// No associated data is used; the envelope's own `public_key` field
/// carries the sender key the peer needs for its side of the derivation.
pub fn encrypt(
    plaintext: &[u8],
    peer_public_key: &[u8],
    keypair: &KeyPair,
) -> Result<EncryptedEnvelope, EnvelopeError> {
    let session_key = derive_for_peer(keypair, peer_public_key)?;

    let mut nonce = [0u8; WIRE_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(session_key.as_bytes())
        .map_err(|e| EnvelopeError::Encryption(format!("cipher construction: {e}")))?;

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce[..GCM_IV_LEN]),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|e| EnvelopeError::Encryption(e.to_string()))?;

    Ok(EncryptedEnvelope {
        nonce: hex::encode(nonce),
        public_key: hex::encode(keypair.public_wrapped()),
        data: hex::encode(ciphertext),
    })
}

/// Decrypt an envelope, deriving the session key from `keypair` and the
/// envelope's embedded sender public key.
///
/// A failed tag check yields [`EnvelopeError::Authentication`] and nothing
/// else — partial plaintext is never surfaced.
pub fn decrypt(envelope: &EncryptedEnvelope, keypair: &KeyPair) -> Result<Vec<u8>, EnvelopeError> {
    let nonce = decode_hex_field("nonce", &envelope.nonce)?;
    if nonce.len() < GCM_IV_LEN {
        return Err(EnvelopeError::InvalidField {
            field: "nonce",
            reason: format!("expected at least {GCM_IV_LEN} bytes, got {}", nonce.len()),
        });
    }

    let peer_public_key = decode_hex_field("public_key", &envelope.public_key)?;
    let ciphertext = decode_hex_field("data", &envelope.data)?;

    let session_key = derive_for_peer(keypair, &peer_public_key)?;

    let cipher = Aes256Gcm::new_from_slice(session_key.as_bytes())
        .map_err(|e| EnvelopeError::Encryption(format!("cipher construction: {e}")))?;

    cipher
        .decrypt(
            Nonce::from_slice(&nonce[..GCM_IV_LEN]),
            Payload {
                msg: ciphertext.as_slice(),
                aad: b"",
            },
        )
        .map_err(|_| EnvelopeError::Authentication)
}

fn decode_hex_field(field: &'static str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| EnvelopeError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

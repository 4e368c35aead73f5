//! A hand-written mock enclave peer implementing the [`Transport`] seam.
//!
//! Serves an attestation document for its own keypair and echoes decrypted
//! request plaintext back inside a response envelope — the server half of
//! the protocol, driven entirely in-process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_cbor::Value;

use fabstir_tee_channel::envelope::{decrypt, encrypt};
use fabstir_tee_channel::{
    curve_ops, CurveIdentity, EncryptedEnvelope, KeyPair, Transport, TransportError,
    TransportResponse,
};

pub struct MockEnclave {
    keypair: KeyPair,
    /// Refuse GET /attestation with 405, forcing the POST fallback.
    pub post_only: bool,
    /// Respond with the JSON base64 wrapper instead of raw CBOR.
    pub json_framing: bool,
    /// Embed an all-zero public key in the attestation document.
    pub zero_public_key: bool,
}

impl MockEnclave {
    pub fn new(curve: CurveIdentity) -> Self {
        Self {
            keypair: curve_ops(curve).generate_keypair().unwrap(),
            post_only: false,
            json_framing: false,
            zero_public_key: false,
        }
    }

    pub fn public_point(&self) -> Vec<u8> {
        self.keypair.public_point().to_vec()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    /// CBOR COSE envelope carrying this enclave's attestation document.
    fn attestation_bytes(&self) -> Vec<u8> {
        let embedded_key = if self.zero_public_key {
            vec![0u8; self.keypair.curve().raw_len()]
        } else {
            self.public_point()
        };

        let mut pcrs = BTreeMap::new();
        pcrs.insert(Value::Integer(0), Value::Bytes(vec![0u8; 48]));

        let mut payload = BTreeMap::new();
        payload.insert(Self::text("module_id"), Self::text("i-test-enclave"));
        payload.insert(Self::text("timestamp"), Value::Integer(1_700_000_000));
        payload.insert(Self::text("digest"), Self::text("SHA384"));
        payload.insert(Self::text("pcrs"), Value::Map(pcrs));
        payload.insert(Self::text("public_key"), Value::Bytes(embedded_key));
        let payload_bytes = serde_cbor::to_vec(&Value::Map(payload)).unwrap();

        let protected = serde_cbor::to_vec(&Value::Map(
            [(Value::Integer(1), Value::Integer(-35))].into_iter().collect(),
        ))
        .unwrap();

        serde_cbor::to_vec(&Value::Array(vec![
            Value::Bytes(protected),
            Value::Map(BTreeMap::new()),
            Value::Bytes(payload_bytes),
            Value::Bytes(vec![0u8; 96]),
        ]))
        .unwrap()
    }

    fn attestation_response(&self) -> TransportResponse {
        if self.json_framing {
            let body = serde_json::json!({
                "attestation_doc": BASE64.encode(self.attestation_bytes()),
                "public_key": hex::encode(self.keypair.public_wrapped()),
            });
            TransportResponse {
                status: 200,
                content_type: Some("application/json".to_string()),
                body: serde_json::to_vec(&body).unwrap(),
            }
        } else {
            TransportResponse {
                status: 200,
                content_type: Some("application/cbor".to_string()),
                body: self.attestation_bytes(),
            }
        }
    }

    /// Decrypt the client's envelope, then encrypt the same plaintext back
    /// to the client's ephemeral key — the enclave-side echo handler.
    fn echo(&self, body: &serde_json::Value) -> TransportResponse {
        let request: EncryptedEnvelope = match serde_json::from_value(body.clone()) {
            Ok(envelope) => envelope,
            Err(e) => return Self::error_response(400, &format!("bad envelope: {e}")),
        };

        let client_public_key = match hex::decode(&request.public_key) {
            Ok(bytes) => bytes,
            Err(e) => return Self::error_response(400, &format!("bad public_key: {e}")),
        };

        let plaintext = match decrypt(&request, &self.keypair) {
            Ok(plaintext) => plaintext,
            Err(e) => return Self::error_response(400, &format!("decrypt failed: {e}")),
        };

        let response_envelope = match encrypt(&plaintext, &client_public_key, &self.keypair) {
            Ok(envelope) => envelope,
            Err(e) => return Self::error_response(500, &format!("encrypt failed: {e}")),
        };

        let body = serde_json::json!({ "data": response_envelope });
        TransportResponse {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    fn json_response(status: u16, value: serde_json::Value) -> TransportResponse {
        TransportResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: serde_json::to_vec(&value).unwrap(),
        }
    }

    fn error_response(status: u16, message: &str) -> TransportResponse {
        Self::json_response(status, serde_json::json!({ "error": message }))
    }
}

#[async_trait]
impl Transport for MockEnclave {
    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError> {
        match path {
            "/attestation" if self.post_only => Ok(Self::error_response(405, "use POST")),
            "/attestation" => Ok(self.attestation_response()),
            "/ping" => Ok(Self::json_response(200, serde_json::json!({ "pong": 1 }))),
            _ => Ok(Self::error_response(404, "not found")),
        }
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        match path {
            "/attestation" => Ok(self.attestation_response()),
            "/echo" => Ok(self.echo(body)),
            "/plain" => Ok(Self::json_response(
                200,
                serde_json::json!({ "status": "ok", "echo": body }),
            )),
            "/busy" => Ok(Self::error_response(503, "enclave busy")),
            _ => Ok(Self::error_response(404, "not found")),
        }
    }
}

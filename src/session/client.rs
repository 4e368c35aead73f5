// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session client facade.
//!
//! Orchestrates attestation fetch, decode, curve detection, handshake and
//! envelope encryption behind `connect` / `call` / `call_encrypted`.
//!
//! Clients are explicit, constructible objects — there is no global
//! session singleton, so multi-tenant callers run one client per session.
//! Each client owns exactly one ephemeral keypair at a time; key material
//! is replaced wholesale on reconnect and never shared between clients.

use anyhow::anyhow;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, error, info, warn};

use crate::attestation::{decode_attestation, AttestationDocument, DecodeError};
use crate::envelope::{self, EncryptedEnvelope, KeyMode};
use crate::error::ChannelError;
use crate::handshake::{curve_ops, HandshakeEngine, HandshakeError, HandshakeState, KeyPair};
use crate::keys::{detect_curve, to_wrapped, CurveIdentity};

use super::trace::HandshakeTrace;
use super::transport::{HttpTransport, Transport, TransportError, TransportResponse};

/// Session client configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the enclave service.
    pub endpoint: String,
    /// Path of the attestation endpoint.
    pub attestation_path: String,
    /// Transport timeout per request.
    pub timeout_ms: u64,
    /// Ephemeral key scope for encrypted calls — see [`KeyMode`].
    pub key_mode: KeyMode,
    /// Enable the handshake trace overlay. Deliberately retains plaintext
    /// in memory; never enable in production.
    pub trace: bool,
}

impl SessionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            attestation_path: "/attestation".to_string(),
            timeout_ms: 30_000,
            key_mode: KeyMode::default(),
            trace: false,
        }
    }
}

/// HTTP method for plaintext passthrough calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// State held for one established session.
struct EstablishedSession {
    curve: CurveIdentity,
    /// The enclave's public key in wrapped form, as extracted from the
    /// attestation document.
    peer_public_key: Vec<u8>,
    /// Connect-time ephemeral keypair; used directly in
    /// [`KeyMode::PerConnection`], replaced per call in
    /// [`KeyMode::PerMessage`].
    keypair: KeyPair,
    document: AttestationDocument,
}

/// Caller-facing secure channel client.
pub struct SessionClient<T: Transport = HttpTransport> {
    config: SessionConfig,
    transport: T,
    session: Option<EstablishedSession>,
    trace: Option<HandshakeTrace>,
}

impl SessionClient<HttpTransport> {
    pub fn new(config: SessionConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.endpoint, config.timeout_ms)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> SessionClient<T> {
    /// Build a client over a custom transport (tests use a mock peer).
    pub fn with_transport(config: SessionConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            session: None,
            trace: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> HandshakeState {
        if self.session.is_some() {
            HandshakeState::SessionEstablished
        } else {
            HandshakeState::Uninitialized
        }
    }

    /// The attestation document of the current session, once connected.
    pub fn attestation(&self) -> Option<&AttestationDocument> {
        self.session.as_ref().map(|s| &s.document)
    }

    /// The recorded handshake trace, when tracing is enabled.
    pub fn trace(&self) -> Option<&HandshakeTrace> {
        self.trace.as_ref()
    }

    /// Fetch and decode the enclave's attestation, then establish the
    /// session: extract the embedded public key, detect its curve,
    /// generate this side's ephemeral keypair and validate the peer point.
    ///
    /// Any failure leaves the client `Uninitialized` and safely retryable.
    /// Reconnecting discards all prior key material.
    pub async fn connect(&mut self) -> Result<(), ChannelError> {
        self.session = None;
        self.trace = if self.config.trace {
            warn!("handshake trace enabled; plaintext artifacts will be retained in memory");
            Some(HandshakeTrace::new())
        } else {
            None
        };

        match self.connect_inner().await {
            Ok(()) => {
                info!(endpoint = %self.config.endpoint, "session established");
                Ok(())
            }
            Err(e) => {
                self.session = None;
                error!(endpoint = %self.config.endpoint, error = %e, "connection failed");
                Err(e)
            }
        }
    }

    async fn connect_inner(&mut self) -> Result<(), ChannelError> {
        // 1. Fetch the attestation document
        let response = match self.fetch_attestation().await {
            Ok(response) => {
                self.trace_step(
                    "fetch_attestation",
                    true,
                    format!("status {}, {} bytes", response.status, response.body.len()),
                );
                response
            }
            Err(e) => {
                self.trace_step("fetch_attestation", false, e.to_string());
                return Err(e.into());
            }
        };

        // 2. Unwrap the transport framing (raw CBOR vs base64-in-JSON)
        let (doc_bytes, key_override) = match unwrap_attestation_body(&response) {
            Ok(unwrapped) => unwrapped,
            Err(e) => {
                self.trace_step("attestation_framing", false, e.to_string());
                return Err(e.into());
            }
        };

        // 3. Decode envelope and payload
        let (document, _envelope) = match decode_attestation(&doc_bytes) {
            Ok(decoded) => {
                self.trace_step(
                    "decode_attestation",
                    true,
                    format!(
                        "module_id {}, {} PCRs",
                        decoded.0.module_id,
                        decoded.0.pcrs.len()
                    ),
                );
                decoded
            }
            Err(e) => {
                self.trace_step("decode_attestation", false, e.to_string());
                return Err(e.into());
            }
        };

        // 4. Peer public key: a top-level key in the JSON wrapper wins over
        //    the embedded one, matching the deployed attestation endpoints.
        let peer_public_key = match key_override {
            Some(bytes) => to_wrapped(&bytes)?,
            None => hex::decode(&document.public_key).map_err(|e| DecodeError::Field {
                field: "public_key",
                reason: e.to_string(),
            })?,
        };

        // 5. Detect the curve and run the handshake. `establish` validates
        //    the peer point — an all-zero or off-curve key fails here, at
        //    connect time, never at first use.
        let curve = detect_curve(&peer_public_key)?;
        let mut engine = HandshakeEngine::new(curve);

        let keypair = match self.run_handshake(&mut engine, &peer_public_key) {
            Ok(keypair) => keypair,
            Err(e) => {
                self.trace_step("handshake", false, e.to_string());
                return Err(e.into());
            }
        };
        self.trace_step(
            "handshake",
            true,
            format!(
                "{curve}, ephemeral public {} bytes, peer key {} bytes",
                keypair.public_point().len(),
                peer_public_key.len()
            ),
        );

        self.session = Some(EstablishedSession {
            curve,
            peer_public_key,
            keypair,
            document,
        });
        Ok(())
    }

    fn run_handshake(
        &mut self,
        engine: &mut HandshakeEngine,
        peer_public_key: &[u8],
    ) -> Result<KeyPair, HandshakeError> {
        engine.generate_keys()?;
        engine.establish(peer_public_key)?;
        engine
            .keypair()
            .cloned()
            .ok_or(HandshakeError::InvalidState {
                operation: "keypair access",
                state: engine.state().name(),
            })
    }

    async fn fetch_attestation(&self) -> Result<TransportResponse, TransportError> {
        let path = self.config.attestation_path.clone();
        let response = self.transport.get(&path).await?;

        // Some deployments only serve attestation over POST; retry on 405.
        let response = if response.status == 405 {
            debug!("attestation GET returned 405, retrying as POST");
            self.transport
                .post_json(&path, &serde_json::json!({}))
                .await?
        } else {
            response
        };

        response.require_success(&path)
    }

    /// Plaintext request/response passthrough for public endpoints.
    ///
    /// Not part of the secure-channel contract proper — the common entry
    /// point `call_encrypted` layers on top of.
    pub async fn call(
        &self,
        path: &str,
        method: Method,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ChannelError> {
        let response = match method {
            Method::Get => self.transport.get(path).await?,
            Method::Post => {
                let payload = body.cloned().unwrap_or(serde_json::Value::Null);
                self.transport.post_json(path, &payload).await?
            }
        };
        let response = response.require_success(path)?;

        if response.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(response.json()?)
    }

    /// Encrypt `body` to the enclave, POST it, and decrypt the response
    /// when the enclave answers with an encrypted envelope (nested under
    /// `data`); plain JSON responses pass through.
    ///
    /// Transport failures surface loudly with any structured server-side
    /// detail. A failure here never corrupts session state: the call is
    /// retryable without a fresh handshake unless the error was a
    /// [`HandshakeError`].
    pub async fn call_encrypted(
        &mut self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ChannelError> {
        let (curve, peer_public_key, connection_keypair) = match &self.session {
            Some(session) => (
                session.curve,
                session.peer_public_key.clone(),
                session.keypair.clone(),
            ),
            None => return Err(ChannelError::NotConnected),
        };

        let keypair = match self.config.key_mode {
            KeyMode::PerMessage => curve_ops(curve).generate_keypair()?,
            KeyMode::PerConnection => connection_keypair,
        };

        let plaintext = serde_json::to_vec(body)?;
        let request_envelope = envelope::encrypt(&plaintext, &peer_public_key, &keypair)?;
        self.trace_step(
            "encrypt_request",
            true,
            format!(
                "plaintext: {}",
                String::from_utf8_lossy(&plaintext)
            ),
        );

        let response = match self.transport.post_json(path, &serde_json::to_value(&request_envelope)?).await {
            Ok(response) => response,
            Err(e) => {
                self.trace_step("transmit", false, e.to_string());
                return Err(e.into());
            }
        };
        let response = match response.require_success(path) {
            Ok(response) => {
                self.trace_step("transmit", true, format!("status {}", response.status));
                response
            }
            Err(e) => {
                self.trace_step("transmit", false, e.to_string());
                return Err(e.into());
            }
        };

        let value: serde_json::Value = response.json()?;

        // Encrypted responses nest an envelope under `data`; anything that
        // does not parse as an envelope passes through as plain JSON.
        let encrypted = value
            .get("data")
            .filter(|data| data.is_object())
            .and_then(|data| serde_json::from_value::<EncryptedEnvelope>(data.clone()).ok());

        match encrypted {
            Some(response_envelope) => {
                let decrypted = match envelope::decrypt(&response_envelope, &keypair) {
                    Ok(plaintext) => plaintext,
                    Err(e) => {
                        self.trace_step("decrypt_response", false, e.to_string());
                        return Err(e.into());
                    }
                };
                self.trace_step(
                    "decrypt_response",
                    true,
                    format!("plaintext: {}", String::from_utf8_lossy(&decrypted)),
                );
                Ok(serde_json::from_slice(&decrypted)?)
            }
            None => {
                self.trace_step("plain_response", true, "no encrypted envelope in response");
                Ok(value)
            }
        }
    }

    fn trace_step(&mut self, name: &'static str, success: bool, detail: impl Into<String>) {
        if let Some(trace) = self.trace.as_mut() {
            trace.step(name, success, detail);
        }
    }
}

/// Split an attestation response into document bytes plus an optional
/// top-level public key.
///
/// Two framings are accepted: raw CBOR bytes (octet-stream/CBOR content
/// types) and a JSON wrapper `{"attestation_doc": "<base64>", "public_key":
/// "<hex>"}`.
fn unwrap_attestation_body(
    response: &TransportResponse,
) -> Result<(Vec<u8>, Option<Vec<u8>>), DecodeError> {
    let looks_like_json = response
        .content_type
        .as_deref()
        .map(|ct| ct.contains("json"))
        .unwrap_or(false)
        || response
            .body
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .copied()
            == Some(b'{');

    if !looks_like_json {
        return Ok((response.body.clone(), None));
    }

    parse_json_wrapper(&response.body).map_err(|e| DecodeError::Envelope {
        stage: "transport framing",
        reason: e.to_string(),
    })
}

fn parse_json_wrapper(body: &[u8]) -> anyhow::Result<(Vec<u8>, Option<Vec<u8>>)> {
    let value: serde_json::Value = serde_json::from_slice(body)?;

    let doc_b64 = value
        .get("attestation_doc")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("JSON attestation response has no 'attestation_doc' field"))?;
    let doc = BASE64.decode(doc_b64.trim())?;

    let key = match value.get("public_key").and_then(|v| v.as_str()) {
        Some(text) => {
            let stripped = text.strip_prefix("0x").unwrap_or(text);
            Some(hex::decode(stripped)?)
        }
        None => None,
    };

    Ok((doc, key))
}

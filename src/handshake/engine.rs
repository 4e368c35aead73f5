//! Handshake state machine and session-key derivation.

use hkdf::Hkdf;
use sha2::Sha256;
use tracing::debug;

use crate::keys::{detect_curve, to_raw, CurveIdentity};

use super::curves::{curve_ops, KeyPair, SessionKey};
use super::error::HandshakeError;

/// HKDF info string fixed by the enclave side of the protocol.
///
/// Together with the empty salt this must match the peer's KDF exactly;
/// "improving" the derivation with a random salt or a different context
/// string breaks interoperability with every deployed enclave.
pub const ENCRYPTION_INFO: &[u8] = b"encryption data";

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Uninitialized,
    KeysGenerated,
    SessionEstablished,
}

impl HandshakeState {
    pub fn name(&self) -> &'static str {
        match self {
            HandshakeState::Uninitialized => "uninitialized",
            HandshakeState::KeysGenerated => "keys_generated",
            HandshakeState::SessionEstablished => "session_established",
        }
    }
}

/// Expand an ECDH shared secret into the 256-bit session key.
///
/// HKDF-SHA256 with an empty salt and the protocol-constant info string —
/// both fixed for interoperability (see [`ENCRYPTION_INFO`]).
pub fn derive_session_key(shared_secret: &[u8]) -> Result<SessionKey, HandshakeError> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    hkdf.expand(ENCRYPTION_INFO, &mut key)
        .map_err(|e| HandshakeError::Derivation {
            stage: "HKDF expand",
            reason: e.to_string(),
        })?;
    Ok(SessionKey::new(key))
}

/// Derive the session key for one keypair against a peer's public key
/// (wrapped or raw form).
///
/// This is the stateless core both ends rely on: each side contributes its
/// own ephemeral keypair, the other's public key travels in-band, and the
/// same key falls out on both sides. Validation of the peer point happens
/// here, unconditionally — an all-zero or off-curve key fails instead of
/// deriving garbage.
pub fn derive_for_peer(
    keypair: &KeyPair,
    peer_public_key: &[u8],
) -> Result<SessionKey, HandshakeError> {
    let peer_raw = to_raw(peer_public_key).map_err(|e| HandshakeError::InvalidPeerKey {
        stage: "peer key conversion",
        reason: e.to_string(),
    })?;

    let peer_curve = detect_curve(&peer_raw).map_err(|e| HandshakeError::InvalidPeerKey {
        stage: "peer curve detection",
        reason: e.to_string(),
    })?;
    if peer_curve != keypair.curve() {
        return Err(HandshakeError::UnsupportedCurve(format!(
            "session is on {}, peer key is on {}",
            keypair.curve(),
            peer_curve
        )));
    }

    let ops = curve_ops(keypair.curve());
    ops.validate_point(&peer_raw)?;

    let shared = ops.derive_shared_secret(keypair, &peer_raw)?;
    derive_session_key(&shared)
}

/// Three-state handshake driver: `Uninitialized → KeysGenerated →
/// SessionEstablished`.
///
/// Re-entering `KeysGenerated` (reconnect) discards all prior key material;
/// nothing persists across reconnects.
pub struct HandshakeEngine {
    curve: CurveIdentity,
    state: HandshakeState,
    keypair: Option<KeyPair>,
}

impl HandshakeEngine {
    pub fn new(curve: CurveIdentity) -> Self {
        Self {
            curve,
            state: HandshakeState::Uninitialized,
            keypair: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn curve(&self) -> CurveIdentity {
        self.curve
    }

    /// The ephemeral keypair, once generated.
    pub fn keypair(&self) -> Option<&KeyPair> {
        self.keypair.as_ref()
    }

    /// Generate a fresh ephemeral keypair, discarding any previous one.
    pub fn generate_keys(&mut self) -> Result<&KeyPair, HandshakeError> {
        // Wholesale replacement: prior key material is dropped before the
        // new pair is stored, so a reconnect never reuses anything.
        self.keypair = None;
        let keypair = curve_ops(self.curve).generate_keypair()?;
        debug!(curve = %self.curve, "generated ephemeral keypair");
        self.state = HandshakeState::KeysGenerated;
        Ok(self.keypair.insert(keypair))
    }

    /// Complete the handshake against the peer's public key (wrapped form).
    pub fn establish(&mut self, peer_public_key: &[u8]) -> Result<SessionKey, HandshakeError> {
        let keypair = match (&self.state, &self.keypair) {
            (HandshakeState::Uninitialized, _) | (_, None) => {
                return Err(HandshakeError::InvalidState {
                    operation: "establish",
                    state: self.state.name(),
                })
            }
            (_, Some(kp)) => kp,
        };

        let key = derive_for_peer(keypair, peer_public_key)?;
        self.state = HandshakeState::SessionEstablished;
        debug!(curve = %self.curve, "session key established");
        Ok(key)
    }
}

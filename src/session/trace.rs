//! Handshake trace overlay for operator debugging.
//!
//! Records every intermediate artifact of a session — attestation summary,
//! key lengths, ciphertext and plaintext, per-step timing and outcome.
//!
//! This is a diagnostic overlay, not a security boundary: it deliberately
//! retains plaintext in memory, so it must never be enabled by default in a
//! production build. The client logs a warning when it is turned on.

use std::time::Instant;

/// One recorded protocol step.
#[derive(Debug, Clone)]
pub struct TraceStep {
    pub name: &'static str,
    pub detail: String,
    /// Milliseconds since the trace started.
    pub elapsed_ms: u128,
    pub success: bool,
}

/// Ordered record of a session's protocol steps.
#[derive(Debug)]
pub struct HandshakeTrace {
    started: Instant,
    steps: Vec<TraceStep>,
}

impl HandshakeTrace {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            steps: Vec::new(),
        }
    }

    pub(crate) fn step(&mut self, name: &'static str, success: bool, detail: impl Into<String>) {
        self.steps.push(TraceStep {
            name,
            detail: detail.into(),
            elapsed_ms: self.started.elapsed().as_millis(),
            success,
        });
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }
}

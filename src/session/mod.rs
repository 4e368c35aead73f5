// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Client
//!
//! The caller-facing facade over the secure channel: fetch and decode the
//! enclave's attestation, establish a session key, then exchange encrypted
//! request/response payloads.
//!
//! All operations are single-shot request/response calls. There is no
//! internal locking or retry policy: each call derives its own ephemeral
//! state, concurrent callers run independent clients, and a failed call is
//! retried at the transport layer by the caller.

pub mod client;
pub mod trace;
pub mod transport;

pub use client::{Method, SessionClient, SessionConfig};
pub use trace::{HandshakeTrace, TraceStep};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};

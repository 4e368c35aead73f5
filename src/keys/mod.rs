// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Elliptic-Curve Key Format Handling
//!
//! Enclave services emit public keys in two encodings, and the encoding a
//! given call site receives is not always known in advance:
//!
//! - **Raw point**: the bare SEC1 uncompressed point (`0x04 || X || Y`)
//! - **Wrapped**: DER SubjectPublicKeyInfo — a fixed 23-byte algorithm
//!   identifier header followed by the raw point
//!
//! This module detects which of the two supported curves a key belongs to
//! and converts between the forms. Both conversions are idempotent: feeding
//! an already-converted key back in is a no-op.

pub mod convert;
pub mod curve;
pub mod error;

pub use convert::{to_raw, to_wrapped};
pub use curve::{detect_curve, CurveIdentity};
pub use error::CurveDetectionError;

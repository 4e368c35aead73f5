use thiserror::Error;

/// Errors raised while classifying or re-encoding public key bytes.
///
/// Misdetecting a curve corrupts every key derived from it without any
/// visible failure, so these errors carry enough context (the offending
/// length, the curve in question) to diagnose an encoding regression from
/// the error alone.
#[derive(Debug, Error)]
pub enum CurveDetectionError {
    /// The key bytes were empty.
    #[error("empty public key bytes")]
    Empty,

    /// The byte length matches neither the raw nor the wrapped form of the
    /// detected curve, so no conversion is possible.
    #[error("unrecognised {curve} key encoding: {length} bytes matches neither raw nor wrapped form")]
    UnknownEncoding { curve: &'static str, length: usize },

    /// The key has wrapped-form length but does not start with the curve's
    /// SubjectPublicKeyInfo header.
    #[error("malformed wrapped {curve} key: {reason}")]
    MalformedWrapped { curve: &'static str, reason: String },
}

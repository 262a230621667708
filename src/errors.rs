//! Construction and sequencing errors
//!
//! Degenerate geometry is *not* an error: a face whose vertices collapse
//! reports a sentinel invalid normal and stays in the mesh until an
//! [`IntegrityChecker`](crate::integrity::IntegrityChecker) pass decides
//! what to do with it. The variants here cover calls that can be rejected
//! up front.

use crate::float_types::Real;

/// All the ways a construction call or API sequence can be rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A primitive was given dimensions that cannot produce any geometry.
    #[error("invalid {primitive} dimensions: {details}")]
    InvalidDimensions {
        primitive: &'static str,
        details: String,
    },
    /// A primitive needs a strictly positive measure and got `value`.
    #[error("{primitive} requires a positive {what}, got {value}")]
    NonPositive {
        primitive: &'static str,
        what: &'static str,
        value: Real,
    },
    /// A tessellated primitive needs at least `minimum` edges or segments.
    #[error("{primitive} requires at least {minimum} {what}, got {got}")]
    TooFew {
        primitive: &'static str,
        what: &'static str,
        minimum: usize,
        got: usize,
    },
    /// An operation was called in a state that forbids it, e.g. replacing
    /// pooled vertex coordinates while faces still reference them.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A bulk coordinate update did not match the pool's cardinality.
    #[error("expected {expected} points, got {got}")]
    MismatchedLength { expected: usize, got: usize },
}

//! Failure kinds callers need to tell apart.

use std::fmt;

/// Errors with meaning beyond their message. Everything else in the crate
/// travels as a plain `eyre` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefintError {
    /// The working-precision escalation hit its ceiling (or a computed
    /// vector failed the minimum-accuracy floor) without certifying the
    /// requested number of bits. Fatal: the caller must raise the starting
    /// precision, the run never silently degrades.
    InsufficientPrecision {
        target_bits: u32,
        reached_bits: i64,
    },
    /// An output buffer does not match the quartet's
    /// `ncart(am)*ngeneral` product.
    OutputSizeMismatch { expected: usize, got: usize },
    /// A shell descriptor violates its invariants (empty primitives,
    /// non-positive exponent, inconsistent coefficient length).
    InvalidShell(String),
    /// A reference file could not be parsed.
    MalformedFile(String),
}

impl fmt::Display for RefintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefintError::InsufficientPrecision {
                target_bits,
                reached_bits,
            } => write!(
                f,
                "insufficient working precision: requested {} accurate bits, reached {}",
                target_bits, reached_bits
            ),
            RefintError::OutputSizeMismatch { expected, got } => write!(
                f,
                "output buffer holds {} values but the quartet produces {}",
                got, expected
            ),
            RefintError::InvalidShell(msg) => write!(f, "invalid shell: {}", msg),
            RefintError::MalformedFile(msg) => write!(f, "malformed reference file: {}", msg),
        }
    }
}

impl std::error::Error for RefintError {}

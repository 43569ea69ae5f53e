use std::time::Duration;

use thiserror::Error;

/// Input documents violate the data model; the comparison is aborted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{document} parameter #{index} has an empty name")]
    EmptyParameterName { document: &'static str, index: usize },

    #[error("duplicate specification parameter: {0}")]
    DuplicateParameter(String),

    #[error("unknown certificate type '{0}' (expected COA, COCA or COC)")]
    UnknownCertificateType(String),
}

/// The semantic alignment oracle could not produce a usable answer.
///
/// Never surfaced to callers of [`Comparator::compare`](crate::Comparator::compare):
/// any variant triggers the deterministic fallback matcher.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle response omits specification parameter '{0}'")]
    Incomplete(String),
}

/// A value cannot be moved between two units.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("incompatible units: {from} → {to}")]
    Incompatible { from: String, to: String },
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot read tables from {}: {}", .path.display(), .source)]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("tables JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("conversion {from} → {to} has unusable factor {factor}")]
    InvalidFactor { from: String, to: String, factor: f64 },
}

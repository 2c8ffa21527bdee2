// src/error.rs
//
// Error taxonomy for the report engine.
// Caller bugs (bad module, bad filter, missing module) and remote-service
// failures share one enum so every layer can bubble with `?`.

use thiserror::Error;

/// Errors surfaced by the registry, engine, remote client and config loader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    /// Module key not present in the registry.
    #[error("unknown module `{0}`")]
    InvalidModule(String),

    /// Filter references a field the module does not expose.
    #[error("filter field `{field}` is not available on module `{module}`")]
    InvalidFilterField { module: String, field: String },

    /// Filter uses a predicate its filter spec does not allow.
    #[error("predicate `{predicate}` is not allowed for filter `{field}`")]
    InvalidPredicate { field: String, predicate: String },

    /// Two filters share a field and predicate; the remote query holds one
    /// value per pair.
    #[error("filter `{field}` uses predicate `{predicate}` more than once")]
    DuplicateFilter { field: String, predicate: String },

    /// Column projection names a column the module does not declare.
    #[error("column `{column}` is not declared by module `{module}`")]
    InvalidColumn { module: String, column: String },

    /// Page or page size outside the remote API's accepted range.
    #[error("invalid pagination: page {page}, per_page {per_page} (page >= 1, per_page 1..=100)")]
    InvalidPagination { page: u32, per_page: u32 },

    #[error("unknown widget `{0}`")]
    UnknownWidget(String),

    /// Engine used before a module was chosen.
    #[error("no module selected")]
    NoModuleSelected,

    /// Transport-level failure (DNS, connect, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// Remote service answered with a 4xx/5xx status.
    #[error("remote error {status}: {detail}")]
    Remote { status: u16, detail: String },

    /// Response body was not the structured data we expected.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl ReportError {
    /// True for failures originating at the remote service or the wire.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ReportError::Network(_) | ReportError::Remote { .. } | ReportError::Decode(_)
        )
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ReportError::Decode(err.to_string())
        } else {
            ReportError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

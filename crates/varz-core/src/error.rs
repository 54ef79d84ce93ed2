//! Shared error type across varz crates.

use thiserror::Error;

/// Stable error codes, used in log fields and JSON error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A metric with this name is already registered.
    DuplicateName,
    /// The name belongs to a fixed document key.
    ReservedName,
    /// Empty or otherwise unusable metric name.
    InvalidName,
    /// A map entry holds a different kind than the operation expects.
    KindMismatch,
    /// Storing the map would make it contain itself.
    Cycle,
    /// Configuration could not be parsed or failed validation.
    BadConfig,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// Listener could not be bound or the server loop failed.
    Serve,
    /// Snapshot could not be rendered.
    Serialization,
}

impl ErrorCode {
    /// String representation used in JSON responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateName => "DUPLICATE_NAME",
            ErrorCode::ReservedName => "RESERVED_NAME",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::KindMismatch => "KIND_MISMATCH",
            ErrorCode::Cycle => "CYCLE",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Serve => "SERVE",
            ErrorCode::Serialization => "SERIALIZATION",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, VarzError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum VarzError {
    #[error("duplicate metric name: {0}")]
    DuplicateName(String),
    #[error("reserved metric name: {0}")]
    ReservedName(String),
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),
    #[error("kind mismatch for {key}: expected {expected}, found {found}")]
    KindMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("map entry {0} would contain its own map")]
    Cycle(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("serve: {0}")]
    Serve(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl VarzError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            VarzError::DuplicateName(_) => ErrorCode::DuplicateName,
            VarzError::ReservedName(_) => ErrorCode::ReservedName,
            VarzError::InvalidName(_) => ErrorCode::InvalidName,
            VarzError::KindMismatch { .. } => ErrorCode::KindMismatch,
            VarzError::Cycle(_) => ErrorCode::Cycle,
            VarzError::BadConfig(_) => ErrorCode::BadConfig,
            VarzError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            VarzError::Serve(_) => ErrorCode::Serve,
            VarzError::Serialization(_) => ErrorCode::Serialization,
        }
    }
}

impl From<serde_json::Error> for VarzError {
    fn from(e: serde_json::Error) -> Self {
        VarzError::Serialization(e.to_string())
    }
}

//! Error type for pipeline network documents.
//!
//! Loading a network can fail three ways: the file is unreachable, the
//! document is not JSON, or the network it describes is unusable. The last
//! kind is always aggregated — every dangling segment endpoint and
//! out-of-range value found in one pass rides along in the error, mirroring
//! how [`crate::Diagnostics`] collects issues instead of stopping at the
//! first one.
//!
//! Algorithm and solver failures do not use this type; they surface through
//! the optimization result's status and message list.

use thiserror::Error;

/// Failure modes of reading, validating, or writing pipeline networks.
#[derive(Error, Debug)]
pub enum GasNetError {
    /// The configuration or result file could not be read or written
    #[error("cannot access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not syntactically valid JSON
    #[error("malformed network document: {0}")]
    MalformedDocument(String),

    /// The document parsed but describes an unusable network; every issue
    /// found is listed, not just the first
    #[error("invalid network configuration: {}", issues.join("; "))]
    InvalidConfiguration { issues: Vec<String> },

    /// A network or result could not be serialized for writing
    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl GasNetError {
    /// I/O failure with the offending path attached
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        GasNetError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using GasNetError.
pub type GasNetResult<T> = Result<T, GasNetError>;

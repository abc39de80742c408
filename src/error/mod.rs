//! Error handling for the Vecorel toolchain.

pub mod util;

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for schema resolution, encoding and validation
#[derive(Debug, thiserror::Error)]
pub enum VecorelError {
    /// A URI could not be retrieved or parsed
    #[error("Failed to fetch {uri}: {message}")]
    Fetch { uri: String, message: String },

    /// Schema resolution failed (missing core schema, version conflict, ...)
    #[error("Schema error: {0}")]
    Schema(String),

    /// A declared or stored type is invalid
    #[error("Type error: {0}")]
    Type(String),

    /// A value violates a constraint
    #[error("Value error: {0}")]
    Value(String),

    /// Error opening, reading or writing a file
    #[error("IO error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Invalid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Geometry could not be encoded or decoded
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Coordinate reference system could not be parsed or applied
    #[error("CRS error: {0}")]
    Crs(String),

    /// A dataset converter failed
    #[error("Converter error: {0}")]
    Converter(String),

    /// Anything else, with context
    #[error("{0}")]
    Other(String),
}

impl VecorelError {
    /// Create a fetch error tagged with the URI that failed
    pub fn fetch(uri: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    /// Create an IO error tagged with a path
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry(message.into())
    }

    /// Prefix the error message with additional context
    #[must_use]
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Fetch { uri, message } => Self::Fetch {
                uri,
                message: format!("{context}: {message}"),
            },
            Self::Schema(msg) => Self::Schema(format!("{context}: {msg}")),
            Self::Type(msg) => Self::Type(format!("{context}: {msg}")),
            Self::Value(msg) => Self::Value(format!("{context}: {msg}")),
            Self::Geometry(msg) => Self::Geometry(format!("{context}: {msg}")),
            Self::Crs(msg) => Self::Crs(format!("{context}: {msg}")),
            Self::Converter(msg) => Self::Converter(format!("{context}: {msg}")),
            other => Self::Other(format!("{context}: {other}")),
        }
    }
}

/// Result type for Vecorel operations
pub type Result<T> = std::result::Result<T, VecorelError>;

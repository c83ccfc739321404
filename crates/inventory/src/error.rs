//! Error types for inventory retrieval.
//!
//! Errors are categorized so the retry loop knows what is worth another
//! attempt and the pipeline knows what must end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of inventory errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// External query command failed (transient, retryable)
    Transient,
    /// Response or inventory file could not be interpreted
    Data,
    /// Caller supplied filters the source cannot serve
    Usage,
    /// Every consumer went away before the producer finished
    Disconnected,
    /// The producer thread could not be started
    System,
}

impl ErrorCategory {
    /// Whether this error category is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Errors that can occur while retrieving assets.
#[derive(Debug, Error)]
pub enum Error {
    /// The external inventory command could not be spawned or exited non-zero
    #[error("inventory command `{command}` failed: {message}")]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit status or spawn error
        message: String,
        /// Captured output, if any
        output: String,
    },

    /// The external inventory command returned a document we cannot parse
    #[error("invalid response from `{command}`: {source}")]
    InvalidResponse {
        /// Rendered command line
        command: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Inventory file could not be opened
    #[error("cannot read inventory file {path}: {source}")]
    InventoryFile {
        /// File that failed to open
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Inventory file content is malformed
    #[error("malformed inventory file {path}: {source}")]
    InventoryParse {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// A source was asked for a strategy it cannot serve
    #[error("{source_name} inventory: {message}")]
    InvalidFilter {
        /// Inventory source name
        source_name: &'static str,
        /// What was wrong with the filter
        message: String,
    },

    /// All receivers of the asset channel were dropped
    #[error("asset channel has no consumers left")]
    Disconnected,

    /// The producer thread could not be spawned
    #[error("cannot start inventory producer: {0}")]
    Spawn(#[source] std::io::Error),
}

impl Error {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CommandFailed { .. } => ErrorCategory::Transient,
            Self::InvalidResponse { .. }
            | Self::InventoryFile { .. }
            | Self::InventoryParse { .. } => ErrorCategory::Data,
            Self::InvalidFilter { .. } => ErrorCategory::Usage,
            Self::Disconnected => ErrorCategory::Disconnected,
            Self::Spawn(_) => ErrorCategory::System,
        }
    }

    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

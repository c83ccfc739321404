//! Error types for configure/execute dispatch.
//!
//! Every variant except [`Error::Inventory`] and [`Error::WorkerPool`] is
//! scoped to a single asset: it is logged and counted, and the pipeline moves
//! on to the next asset.

use thiserror::Error;

/// Errors that can occur while handling assets.
#[derive(Debug, Error)]
pub enum Error {
    /// No candidate address accepted a login
    #[error("login failed on [{addresses}]: {message}")]
    Login {
        /// Candidate addresses tried
        addresses: String,
        /// Last login error
        message: String,
    },

    /// The renderer had nothing applicable for this device
    #[error("no {device} configuration to be applied")]
    NoRenderableConfig {
        /// "BMC" or "CMC"
        device: &'static str,
    },

    /// Raw configuration could not be rendered
    #[error("cannot render configuration: {0}")]
    Render(String),

    /// Command name not in the supported set
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Login produced a device we have no handling for
    #[error("unknown device type \"{0}\"")]
    UnknownDevice(String),

    /// A device call failed
    #[error("{operation} failed: {message}")]
    Device {
        /// Device operation that failed
        operation: &'static str,
        /// Error reported by the device layer
        message: String,
    },

    /// A command ran but the device reported it unsuccessful
    #[error("command {command} was not successful: {output}")]
    CommandUnsuccessful {
        /// Command name
        command: String,
        /// Output reported by the device
        output: String,
    },

    /// Some configuration sections were rejected
    #[error("{failed} of {total} configuration sections failed to apply")]
    Configure {
        /// Sections that failed
        failed: usize,
        /// Sections attempted
        total: usize,
    },

    /// Firmware update requested without a distribution endpoint
    #[error("no firmware endpoint configured")]
    MissingFirmwareEndpoint,

    /// Inventory producer failed; fatal for the run
    #[error(transparent)]
    Inventory(#[from] inventory::Error),

    /// Consumer pool could not be started; fatal for the run
    #[error("cannot start butler pool: {0}")]
    WorkerPool(String),
}

impl Error {
    /// Shorthand for a failed device call.
    pub fn device(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Device {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for butler operations.
pub type Result<T> = std::result::Result<T, Error>;

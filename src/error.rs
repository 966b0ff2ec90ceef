use crate::channel::{Channel, Direction};
use thiserror::Error;

/// Errors that can occur when using an M58 module.
///
/// All errors from call-context operations are returned synchronously and
/// are never retried inside the driver. The interrupt path has no error
/// channel at all.
#[derive(Error, Debug)]
pub enum Error {
    /// Argument is outside the range accepted by the module.
    #[error("Illegal parameter: {0}")]
    IllegalParameter(String),
    /// Direct I/O against a channel configured the opposite way.
    #[error("Channel {channel} is configured as {configured:?}; operation requires {required:?}")]
    WrongDirection {
        /// The channel that was accessed.
        channel: Channel,
        /// The direction the channel is currently configured for.
        configured: Direction,
        /// The direction the operation needs.
        required: Direction,
    },
    /// Block I/O with no channel enabled for buffering in the needed direction.
    #[error("No {0:?} channel is enabled for block I/O")]
    NoChannelsEnabled(Direction),
    /// Provided buffer is smaller than required for the operation.
    #[error("Provided buffer is too small (expected at least {expected}, got {actual})")]
    BufferTooSmall {
        /// Minimum required buffer size.
        expected: usize,
        /// Actual buffer size provided.
        actual: usize,
    },
    /// A trigger notification is already installed.
    #[error("Trigger signal already installed (target {0})")]
    AlreadyInstalled(u32),
    /// No trigger notification is installed.
    #[error("Trigger signal not installed")]
    NotInstalled,
    /// Notification target id 0 is reserved.
    #[error("Invalid trigger signal target: {0}")]
    InvalidTarget(u32),
    /// Status code not supported in this direction (get or set).
    #[error("Unknown status code {0}")]
    UnknownStatusCode(String),
    /// Identification PROM does not describe an M58 module.
    #[error("Module identification failed: magic=0x{magic:04X}, id={id}")]
    IdentificationMismatch {
        /// Word 0 of the PROM.
        magic: u16,
        /// Word 1 of the PROM.
        id: u16,
    },
    /// A resource needed at init could not be acquired.
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),
    /// Buffered read did not get data within the configured timeout.
    #[error("Timeout waiting for buffered input")]
    Timeout,
    /// The notification delivery layer refused an operation.
    #[error("Signal delivery error: {0}")]
    Signal(String),
}

/// Result type alias for M58 operations.
///
/// This is a convenience alias for `std::result::Result<T, Error>` used
/// throughout the crate to reduce boilerplate.
pub type Result<T> = std::result::Result<T, Error>;

// Helpers for the common IllegalParameter messages
pub(crate) fn illegal_value(what: &str, value: u32) -> Error {
    Error::IllegalParameter(format!("{} value {} out of range", what, value))
}

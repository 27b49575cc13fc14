//! Error types for the stack runtime.

use std::io;
use thiserror::Error;

/// Result type alias for stack operations.
pub type Result<T> = std::result::Result<T, StackError>;

/// Errors that reach the caller. Malformed input from the wire never becomes
/// one of these; it is dropped and traced where it is found.
#[derive(Debug, Error)]
pub enum StackError {
    /// A header or padding did not fit in the packet buffer.
    #[error("buffer error: {0}")]
    Buffer(&'static str),

    /// The driver failed to move a frame.
    #[error("driver error: {0}")]
    Driver(#[from] io::Error),

    /// A bounded table has no room for another key.
    #[error("table full: {capacity} entries")]
    TableFull { capacity: usize },

    /// A handler is already registered on the port.
    #[error("UDP port {0} is already open")]
    PortInUse(u16),

    /// The payload does not fit in a single IPv4 datagram.
    #[error("payload of {0} bytes does not fit in an IPv4 datagram")]
    PayloadTooLarge(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The runner task has stopped and can no longer take commands.
    #[error("stack runner is closed")]
    RunnerClosed,
}

//! Frame error types.

use thiserror::Error;

/// Errors that can occur when decoding a frame or a command class payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// A length byte points past the end of the frame.
    #[error("length field {declared} exceeds remaining {remaining} bytes")]
    LengthMismatch {
        /// Length declared by the frame.
        declared: usize,
        /// Bytes actually available.
        remaining: usize,
    },

    /// A body too long for its one-byte length field.
    #[error("body of {len} bytes exceeds the 255 byte length field")]
    TooLong {
        /// Bytes the length field would have to describe.
        len: usize,
    },

    /// Frame body is empty.
    #[error("empty frame")]
    Empty,

    /// The frame was routed to a handler that cannot interpret it.
    #[error("unexpected frame for command class 0x{expected:02X}: got 0x{actual:02X}")]
    UnexpectedCommandClass {
        /// Command class the handler serves.
        expected: u8,
        /// Command class carried by the frame.
        actual: u8,
    },

    /// Command class payload is too short for its sub-command.
    #[error("payload too short for command 0x{command:02X}: expected {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// The sub-command being decoded.
        command: u8,
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },
}

/// Result type alias for frame operations.
pub type FrameResult<T> = Result<T, FrameError>;

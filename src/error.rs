use std::{io, time::Duration};

use crate::control::{ControlId, ControlStatus};

/// Errors reported by capture sessions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation needs an open device
    #[error("device is not open")]
    NotOpen,

    /// `open` was called twice
    #[error("device is already open")]
    AlreadyOpen,

    /// The operation needs a streaming device
    #[error("device is not streaming")]
    NotStreaming,

    /// `start_stream` was called twice
    #[error("device is already streaming")]
    AlreadyStreaming,

    /// An argument was rejected before any I/O took place
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A path, format or other named entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The device lacks a capability the operation needs
    #[error("{0} is not supported")]
    Unsupported(String),

    /// The control is unknown to the device or has an unsupported type
    #[error("invalid control: {0}")]
    InvalidControl(ControlId),

    /// The control exists but cannot be written in its current state
    #[error("control {id} is unavailable ({status})")]
    ControlUnavailable { id: ControlId, status: ControlStatus },

    /// The driver granted zero buffers
    #[error("driver granted no buffers")]
    NoBuffers,

    /// A system call failed
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// No frame arrived within the configured wait
    #[error("timed out after {0:?} waiting for a frame")]
    Timeout(Duration),

    /// A settings document could not be read or written
    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl Error {
    /// Wraps an OS error with the name of the call that produced it
    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        Error::Io { op, source }
    }

    /// Raw OS error code of an I/O failure, if any
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Returns whether a failed call should simply be issued again
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EINTR) | Some(libc::EAGAIN)
    )
}

/// Returns whether a failed call signals "no item at this index"
pub(crate) fn is_out_of_range(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINVAL)
}

//! Error taxonomy shared by every public operation of the service.
//!
//! Expected failures (unknown id, wrong state, contradictory input) are
//! ordinary values of [`DmError`], never panics.  Each variant maps to a
//! stable numeric result code via [`DmError::code`], which is what the IPC
//! layer (outside this crate) hands to clients; success is `DM_OK` (0).

use thiserror::Error;

use super::ids::{DisplayId, PersistentId, ScreenId};

/// Result code for success at the IPC boundary.
pub const DM_OK: i32 = 0;

/// Failure kinds returned by the display manager and session layers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DmError {
    /// Malformed or contradictory input (zero dimensions, self-mirror, ...).
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The referenced screen does not exist or cannot be used this way.
    #[error("invalid screen: {0}")]
    InvalidScreen(ScreenId),

    /// The referenced display does not exist.
    #[error("invalid display: {0}")]
    InvalidDisplay(DisplayId),

    /// The session is unknown or not in a state that allows the operation.
    #[error("invalid session {id}: {reason}")]
    InvalidSession { id: PersistentId, reason: String },

    /// A required collaborator handle was absent.
    #[error("required handle missing: {0}")]
    NullReference(&'static str),

    /// The capability is not available on this device.
    #[error("device does not support {0}")]
    DeviceNotSupport(&'static str),

    /// Event forwarding refused, e.g. a dialog owns the input.
    #[error("permission denied: {0}")]
    InvalidPermission(String),

    /// A collaborator across the process boundary failed.
    #[error("ipc to collaborator failed: {0}")]
    IpcFailed(String),
}

impl DmError {
    /// Stable numeric code for the IPC boundary.
    pub fn code(&self) -> i32 {
        match self {
            DmError::InvalidParam(_) => 1,
            DmError::InvalidScreen(_) => 2,
            DmError::InvalidDisplay(_) => 3,
            DmError::InvalidSession { .. } => 4,
            DmError::NullReference(_) => 5,
            DmError::DeviceNotSupport(_) => 6,
            DmError::InvalidPermission(_) => 7,
            DmError::IpcFailed(_) => 8,
        }
    }

    /// Shorthand for an [`InvalidSession`](DmError::InvalidSession) error.
    pub fn invalid_session(id: PersistentId, reason: impl Into<String>) -> Self {
        DmError::InvalidSession {
            id,
            reason: reason.into(),
        }
    }
}

/// Converts a result into the numeric code the IPC layer transmits.
pub fn result_code<T>(result: &Result<T, DmError>) -> i32 {
    match result {
        Ok(_) => DM_OK,
        Err(e) => e.code(),
    }
}

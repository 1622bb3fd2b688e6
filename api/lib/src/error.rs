// Copyright (C) Microsoft Corporation. All rights reserved.

use thiserror::Error;

/// Status code for [`SkeError::InvalidHandle`].
pub const SKE_STATUS_INVALID_HANDLE: isize = -136;
/// Status code for [`SkeError::NotPermitted`].
pub const SKE_STATUS_NOT_PERMITTED: isize = -133;
/// Status code for [`SkeError::InvalidArgument`].
pub const SKE_STATUS_INVALID_ARGUMENT: isize = -135;
/// Status code for [`SkeError::BufferTooSmall`].
pub const SKE_STATUS_BUFFER_TOO_SMALL: isize = -138;
/// Status code for [`SkeError::BadState`].
pub const SKE_STATUS_BAD_STATE: isize = -137;
/// Status code for [`SkeError::NotSupported`].
pub const SKE_STATUS_NOT_SUPPORTED: isize = -134;
/// Status code for [`SkeError::AuthenticationFailed`].
pub const SKE_STATUS_AUTHENTICATION_FAILED: isize = -149;
/// Status code for [`SkeError::CorruptionDetected`].
pub const SKE_STATUS_CORRUPTION_DETECTED: isize = -151;

/// SKE Error
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum SkeError {
    /// Key handle does not name a live key
    #[error("invalid key handle")]
    InvalidHandle,

    /// Key attributes forbid the request: wrong usage direction, an
    /// algorithm other than the one bound to the key, or destroying a key
    /// that an operation still holds.
    #[error("not permitted")]
    NotPermitted,

    /// Malformed argument
    #[error("invalid argument")]
    InvalidArgument,

    /// Output buffer too small for the data the call would produce.
    /// Checked before anything is written.
    #[error("buffer too small")]
    BufferTooSmall,

    /// Call is not legal in the operation's current state
    #[error("bad state")]
    BadState,

    /// Combination the engine does not implement
    #[error("not supported")]
    NotSupported,

    /// Tag verification failed; no plaintext from the failing call may be
    /// trusted.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Internal consistency failure; abort the operation and do not reuse
    /// it.
    #[error("corruption detected")]
    CorruptionDetected,
}

impl SkeError {
    /// Converts the error into its stable negative status code, for
    /// consumers that cannot carry a Rust enum across a boundary.
    pub fn to_error_code(&self) -> isize {
        match self {
            SkeError::InvalidHandle => SKE_STATUS_INVALID_HANDLE,
            SkeError::NotPermitted => SKE_STATUS_NOT_PERMITTED,
            SkeError::InvalidArgument => SKE_STATUS_INVALID_ARGUMENT,
            SkeError::BufferTooSmall => SKE_STATUS_BUFFER_TOO_SMALL,
            SkeError::BadState => SKE_STATUS_BAD_STATE,
            SkeError::NotSupported => SKE_STATUS_NOT_SUPPORTED,
            SkeError::AuthenticationFailed => SKE_STATUS_AUTHENTICATION_FAILED,
            SkeError::CorruptionDetected => SKE_STATUS_CORRUPTION_DETECTED,
        }
    }
}

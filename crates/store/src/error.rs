//! Status codes and the uniform result type returned by every operation.
//!
//! Every layer of the store — codec, identifier validation, typed
//! collections, and the services built on top — reports failure through the
//! same shape: a [`Status`] code plus one human-readable message, carried by
//! [`Error`]. Callers compose failures with `?`. Backend driver errors never
//! cross the collection boundary; they are translated exactly once, in
//! [`crate::collection`].

use thiserror::Error;

/// Outcome vocabulary shared by every operation in the stack.
///
/// The numeric codes follow the common RPC convention so a result can be
/// forwarded to a transport layer without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation succeeded.
    Ok,
    /// The caller supplied a malformed or conflicting argument.
    InvalidArgument,
    /// No document exists at the requested identifier and domain.
    NotFound,
    /// The caller's domain could not be resolved.
    Unauthenticated,
    /// The operation is not available on this surface.
    Unimplemented,
    /// A backend round-trip failed for a reason outside the caller's control.
    Internal,
}

impl Status {
    /// Transport-level numeric code for this status.
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::InvalidArgument => 3,
            Status::NotFound => 5,
            Status::Unimplemented => 12,
            Status::Internal => 13,
            Status::Unauthenticated => 16,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Status::Ok => "ok",
            Status::InvalidArgument => "invalid argument",
            Status::NotFound => "not found",
            Status::Unauthenticated => "unauthenticated",
            Status::Unimplemented => "unimplemented",
            Status::Internal => "internal",
        })
    }
}

/// A failed operation: exactly one status and one message.
///
/// ```
/// use trellis_store::{Error, Status};
///
/// let err = Error::not_found("no such resource");
/// assert_eq!(err.status(), Status::NotFound);
/// assert_eq!(err.to_string(), "not found: no such resource");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct Error {
    status: Status,
    message: String,
}

impl Error {
    /// Builds an error from an arbitrary status and message.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Error {
            status,
            message: message.into(),
        }
    }

    /// A malformed or conflicting caller argument.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::new(Status::InvalidArgument, message)
    }

    /// Nothing stored at the requested identifier and domain.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::new(Status::NotFound, message)
    }

    /// The caller's domain could not be resolved.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Error::new(Status::Unauthenticated, message)
    }

    /// The requested surface is not available.
    pub fn unimplemented(message: impl Into<String>) -> Self {
        Error::new(Status::Unimplemented, message)
    }

    /// A backend failure outside the caller's control.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::new(Status::Internal, message)
    }

    /// The status carried by this error.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The human-readable message carried by this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

//! Application error codes and network errors.

use std::error::Error as StdError;

use thiserror::Error;

/// An application-level error code and reason.
///
/// Carried to the peer when a stream is cancelled or a connection is closed
/// with an error. Interpretation of the code is up to the application
/// protocol running on top (HTTP/3 defines its own registry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("application error {code:#x}: {message}")]
pub struct ApplicationError {
    code: u64,
    message: String,
}

impl ApplicationError {
    pub fn new(code: u64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The numeric error code.
    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by connection and stream operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// A non-blocking open found no stream credit left.
    #[error("too many open streams")]
    TooManyOpenStreams,

    /// An error raised by the transport backend, passed through as is.
    #[error(transparent)]
    Native(Box<dyn StdError + Send + Sync>),
}

impl NetworkError {
    /// Wrap a backend error without reclassifying it.
    pub fn native<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Native(Box::new(err))
    }

    /// Recover the backend error value, if this is one of type `T`.
    pub fn downcast_native<T>(&self) -> Option<&T>
    where
        T: StdError + 'static,
    {
        match self {
            Self::Native(err) => err.downcast_ref::<T>(),
            Self::TooManyOpenStreams => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("backend closed")]
    struct BackendClosed;

    #[test]
    fn application_error_accessors() {
        let err = ApplicationError::new(0x100, "no error");
        assert_eq!(err.code(), 0x100);
        assert_eq!(err.message(), "no error");
        assert_eq!(err.to_string(), "application error 0x100: no error");
    }

    #[test]
    fn native_error_is_transparent() {
        let err = NetworkError::native(BackendClosed);
        assert_eq!(err.to_string(), "backend closed");
        assert_eq!(err.downcast_native::<BackendClosed>(), Some(&BackendClosed));
        assert!(err.downcast_native::<std::io::Error>().is_none());
    }

    #[test]
    fn stream_limit_is_not_native() {
        let err = NetworkError::TooManyOpenStreams;
        assert!(err.downcast_native::<BackendClosed>().is_none());
    }
}

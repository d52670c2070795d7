//! Service-request error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors observed by the client side of a synchronous service request.
#[derive(Debug, Error)]
pub enum SvcError {
    /// The wait deadline elapsed before any reply arrived.
    ///
    /// The reply slot is detached on timeout: a reply produced later is
    /// discarded and never reaches the caller.
    #[error("service result is not received yet")]
    ResultNotReceivedYet,

    /// The service handler failed while producing the reply, or the request
    /// was dropped without ever reaching a matching handler.
    #[error("service handler failed: {0}")]
    SvcHandlerFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = SvcError::ResultNotReceivedYet;
        assert_eq!(err.to_string(), "service result is not received yet");
    }

    #[test]
    fn test_handler_failed_display() {
        let err = SvcError::SvcHandlerFailed("division by zero".to_string());
        assert!(err.to_string().contains("service handler failed"));
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SvcError>();
    }
}

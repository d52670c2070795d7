//! Dispatcher and binder error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors raised by dispatcher lifecycle and binding operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A binder referenced a dispatcher name the environment does not know.
    #[error("unknown dispatcher: '{0}'")]
    UnknownDispatcher(String),

    /// The dispatcher rejected the agent.
    #[error("failed to bind agent to dispatcher: {0}")]
    BindFailed(String),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_dispatcher_display() {
        let err = DispatchError::UnknownDispatcher("active_obj".to_string());
        assert!(err.to_string().contains("unknown dispatcher"));
        assert!(err.to_string().contains("active_obj"));
    }

    #[test]
    fn test_bind_failed_display() {
        let err = DispatchError::BindFailed("shutdown in progress".to_string());
        assert!(err.to_string().contains("failed to bind"));
        assert!(err.to_string().contains("shutdown in progress"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DispatchError>();
    }
}

//! Registry error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors raised by cooperation registration and deregistration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The name is taken by a registered or still-deregistering
    /// cooperation.
    #[error("cooperation name '{0}' is already registered")]
    DuplicateCoopName(String),

    /// The named parent cooperation is not registered.
    #[error("parent cooperation '{0}' is not registered")]
    ParentCoopNotFound(String),

    /// The cooperation has no parent to report.
    #[error("cooperation '{0}' has no parent cooperation")]
    CoopHasNoParent(String),

    /// The named parent began deregistration and no longer accepts
    /// children.
    #[error("parent cooperation '{0}' has stopped accepting children")]
    ParentStoppedAcceptingChildren(String),

    /// The environment is shutting down; no registration is accepted.
    #[error("environment is shutting down; cooperations cannot be registered")]
    ShuttingDown,

    /// Deregistration was requested for an unknown cooperation name.
    #[error("cooperation '{0}' is not registered")]
    CoopNotRegistered(String),

    /// An agent's `define` hook or binder failed during registration; all
    /// earlier effects of the registration were rolled back.
    #[error("registration of cooperation '{coop}' failed: {reason}")]
    RegistrationFailed { coop: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_display() {
        let err = RegistryError::DuplicateCoopName("pipeline".to_string());
        assert!(err.to_string().contains("already registered"));
        assert!(err.to_string().contains("pipeline"));
    }

    #[test]
    fn test_parent_not_found_display() {
        let err = RegistryError::ParentCoopNotFound("root".to_string());
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_shutting_down_display() {
        let err = RegistryError::ShuttingDown;
        assert!(err.to_string().contains("shutting down"));
    }

    #[test]
    fn test_registration_failed_display() {
        let err = RegistryError::RegistrationFailed {
            coop: "pipeline".to_string(),
            reason: "unknown dispatcher: 'io'".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("pipeline"));
        assert!(rendered.contains("unknown dispatcher"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RegistryError>();
    }
}

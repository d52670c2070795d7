// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use thiserror::Error;
use tracing::error;

// Layer 3: Internal module imports
// (none)

/// An agent hook or handler panicked; the payload is carried as a fault.
#[derive(Debug, Error)]
#[error("panic: {0}")]
pub(crate) struct PanicFault(pub(crate) String);

/// Guard for registry-locked sections where a panic would leave partial
/// state behind. Armed until `disarm`; unwinding past an armed guard logs
/// and aborts the process.
pub(crate) struct AbortOnPanic {
    context: &'static str,
    armed: bool,
}

impl AbortOnPanic {
    pub(crate) fn new(context: &'static str) -> Self {
        Self {
            context,
            armed: true,
        }
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if self.armed && std::thread::panicking() {
            error!(
                context = self.context,
                "panic inside a registry-critical section; work cannot be continued"
            );
            std::process::abort();
        }
    }
}

/// Render a `catch_unwind` payload into something loggable.
///
/// Panic payloads are almost always `&str` or `String`; anything else is
/// reported as opaque.
pub(crate) fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_str_panic() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(describe_panic(payload.as_ref()), "boom");
    }

    #[test]
    fn test_describe_string_panic() {
        let payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(describe_panic(payload.as_ref()), "boom");
    }

    #[test]
    fn test_describe_opaque_panic() {
        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(describe_panic(payload.as_ref()), "non-string panic payload");
    }
}

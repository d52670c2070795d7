// Layer 1: Standard library imports
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use super::error::SvcError;
use super::slot::ReplySlot;

/// Client-side handle for a synchronous service request.
///
/// Produced by [`Mbox::request`](crate::mailbox::Mbox::request) and
/// [`Mbox::request_signal`](crate::mailbox::Mbox::request_signal). The
/// request has already been delivered when the handle is returned; the
/// handle only selects the waiting mode.
///
/// # Example
/// ```rust,ignore
/// let reply: String = svc_mbox
///     .request::<String, _>(Convert { value: 3 })
///     .wait_for(Duration::from_millis(50))?;
/// ```
pub struct RequestHandle<R> {
    slot: Arc<ReplySlot>,
    _reply: PhantomData<fn() -> R>,
}

impl<R: Send + 'static> RequestHandle<R> {
    pub(crate) fn new(slot: Arc<ReplySlot>) -> Self {
        Self {
            slot,
            _reply: PhantomData,
        }
    }

    /// Block the calling thread until the reply arrives.
    ///
    /// Never returns [`SvcError::ResultNotReceivedYet`]. Issuing this from a
    /// worker that must itself execute the service handler deadlocks; see
    /// the module documentation.
    pub fn wait_forever(self) -> Result<R, SvcError> {
        Self::decode(self.slot.wait_forever())
    }

    /// Block the calling thread until the reply arrives or `timeout`
    /// elapses.
    ///
    /// On timeout the slot is detached: the request stays delivered, but a
    /// reply produced after the deadline is discarded.
    pub fn wait_for(self, timeout: Duration) -> Result<R, SvcError> {
        Self::decode(self.slot.wait_for(timeout))
    }

    fn decode(outcome: Result<Box<dyn std::any::Any + Send>, SvcError>) -> Result<R, SvcError> {
        match outcome?.downcast::<R>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(SvcError::SvcHandlerFailed(format!(
                "reply type mismatch: expected {}",
                std::any::type_name::<R>()
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Tests are allowed to use unwrap and panic for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_wait_forever_decodes_value() {
        let slot = ReplySlot::new();
        slot.complete(Box::new(41_u64));

        let handle = RequestHandle::<u64>::new(slot);
        assert_eq!(handle.wait_forever().unwrap(), 41);
    }

    #[test]
    fn test_reply_type_mismatch() {
        let slot = ReplySlot::new();
        slot.complete(Box::new("not a number".to_string()));

        let handle = RequestHandle::<u64>::new(slot);
        match handle.wait_forever() {
            Err(SvcError::SvcHandlerFailed(kind)) => {
                assert!(kind.contains("reply type mismatch"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_wait_for_timeout() {
        let slot = ReplySlot::new();
        let handle = RequestHandle::<u64>::new(slot);

        match handle.wait_for(Duration::from_millis(10)) {
            Err(SvcError::ResultNotReceivedYet) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

// Layer 1: Standard library imports
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::{Condvar, Mutex};

// Layer 3: Internal module imports
use super::error::SvcError;

/// One-shot synchronized container for a service reply.
///
/// The slot is shared between the client (which waits on it) and the
/// envelope travelling through the mailbox (which completes it). Only the
/// first completion wins; once the client has timed out, the slot is
/// detached and any late completion is silently discarded.
pub(crate) struct ReplySlot {
    state: Mutex<SlotState>,
    resolved: Condvar,
}

enum SlotState {
    /// No reply yet; a client may still be waiting.
    Pending,
    /// A reply value arrived and has not been consumed.
    Value(Box<dyn Any + Send>),
    /// The handler failed; carries the rendered failure.
    Failed(String),
    /// The client gave up waiting; completions are discarded.
    Detached,
    /// The client already took the outcome.
    Consumed,
}

impl ReplySlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Pending),
            resolved: Condvar::new(),
        })
    }

    /// Store a successful reply. First completion wins.
    pub(crate) fn complete(&self, value: Box<dyn Any + Send>) {
        let mut state = self.state.lock();
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Value(value);
            self.resolved.notify_one();
        }
    }

    /// Store a failure. First completion wins.
    pub(crate) fn fail(&self, kind: impl Into<String>) {
        let mut state = self.state.lock();
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Failed(kind.into());
            self.resolved.notify_one();
        }
    }

    /// True while no completion has been stored and no client detached.
    pub(crate) fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Pending)
    }

    /// Block until the slot resolves.
    pub(crate) fn wait_forever(&self) -> Result<Box<dyn Any + Send>, SvcError> {
        let mut state = self.state.lock();
        while matches!(*state, SlotState::Pending) {
            self.resolved.wait(&mut state);
        }
        Self::take_outcome(&mut state)
    }

    /// Block until the slot resolves or the duration elapses.
    ///
    /// On timeout the slot is detached so a late reply cannot be observed.
    pub(crate) fn wait_for(&self, timeout: Duration) -> Result<Box<dyn Any + Send>, SvcError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while matches!(*state, SlotState::Pending) {
            if self.resolved.wait_until(&mut state, deadline).timed_out() {
                if matches!(*state, SlotState::Pending) {
                    *state = SlotState::Detached;
                    return Err(SvcError::ResultNotReceivedYet);
                }
                break;
            }
        }
        Self::take_outcome(&mut state)
    }

    fn take_outcome(state: &mut SlotState) -> Result<Box<dyn Any + Send>, SvcError> {
        match std::mem::replace(state, SlotState::Consumed) {
            SlotState::Value(value) => Ok(value),
            SlotState::Failed(kind) => Err(SvcError::SvcHandlerFailed(kind)),
            other => {
                // Pending is excluded by the wait loops; Detached/Consumed
                // mean the handle was misused after resolution.
                *state = other;
                Err(SvcError::SvcHandlerFailed(
                    "reply slot already consumed".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Tests are allowed to use unwrap and panic for simplicity
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_complete_then_wait() {
        let slot = ReplySlot::new();
        slot.complete(Box::new(7_i32));

        let value = slot.wait_forever().unwrap();
        assert_eq!(*value.downcast::<i32>().unwrap(), 7);
    }

    #[test]
    fn test_fail_then_wait() {
        let slot = ReplySlot::new();
        slot.fail("broken");

        match slot.wait_forever() {
            Err(SvcError::SvcHandlerFailed(kind)) => assert_eq!(kind, "broken"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_first_completion_wins() {
        let slot = ReplySlot::new();
        slot.complete(Box::new(1_i32));
        slot.fail("late failure is ignored");

        let value = slot.wait_forever().unwrap();
        assert_eq!(*value.downcast::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_timeout_detaches() {
        let slot = ReplySlot::new();

        match slot.wait_for(Duration::from_millis(20)) {
            Err(SvcError::ResultNotReceivedYet) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }

        // A late completion must be discarded.
        slot.complete(Box::new(9_i32));
        assert!(!slot.is_pending());
        match slot.wait_for(Duration::from_millis(5)) {
            Err(SvcError::SvcHandlerFailed(_)) => {}
            other => panic!("late value leaked to the caller: {other:?}"),
        }
    }

    #[test]
    fn test_cross_thread_completion() {
        let slot = ReplySlot::new();
        let completer = Arc::clone(&slot);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completer.complete(Box::new("pong".to_string()));
        });

        let value = slot.wait_for(Duration::from_secs(5)).unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "pong");
        handle.join().unwrap();
    }
}

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::{Condvar, Mutex};
use tracing::warn;

// Layer 3: Internal module imports
use crate::coop::runtime::CoopRuntime;

/// Channel feeding the final-deregistration worker.
///
/// Cooperations whose usage count reached zero are pushed here from
/// whatever worker processed the last agent's final event; a single
/// dedicated thread drains the channel. Closing retains already-queued
/// content: the worker finishes the backlog and then exits.
#[derive(Clone)]
pub(crate) struct FinalDeregChannel {
    inner: Arc<ChanInner>,
}

struct ChanInner {
    state: Mutex<ChanState>,
    available: Condvar,
}

struct ChanState {
    queue: VecDeque<Arc<CoopRuntime>>,
    closed: bool,
}

impl FinalDeregChannel {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(ChanInner {
                state: Mutex::new(ChanState {
                    queue: VecDeque::new(),
                    closed: false,
                }),
                available: Condvar::new(),
            }),
        }
    }

    pub(crate) fn push(&self, coop: Arc<CoopRuntime>) {
        let mut state = self.inner.state.lock();
        if state.closed {
            warn!(coop = %coop.name(), "final-dereg channel already closed; demand dropped");
            return;
        }
        state.queue.push_back(coop);
        self.inner.available.notify_one();
    }

    pub(crate) fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        self.inner.available.notify_all();
    }

    /// Take the next cooperation, blocking while the channel is open and
    /// empty. `None` once the channel is closed and drained.
    pub(crate) fn pop_blocking(&self) -> Option<Arc<CoopRuntime>> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(coop) = state.queue.pop_front() {
                return Some(coop);
            }
            if state.closed {
                return None;
            }
            self.inner.available.wait(&mut state);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_close_drains_backlog_first() {
        let chan = FinalDeregChannel::new();
        let rt = CoopRuntime::new(
            "c".to_string(),
            None,
            Vec::new(),
            crate::agent::ExceptionReaction::Inherit,
            Vec::new(),
            Vec::new(),
        );
        chan.push(rt);
        chan.close();

        assert!(chan.pop_blocking().is_some());
        assert!(chan.pop_blocking().is_none());
    }

    #[test]
    fn test_push_after_close_is_dropped() {
        let chan = FinalDeregChannel::new();
        chan.close();
        let rt = CoopRuntime::new(
            "late".to_string(),
            None,
            Vec::new(),
            crate::agent::ExceptionReaction::Inherit,
            Vec::new(),
            Vec::new(),
        );
        chan.push(rt);
        assert_eq!(chan.len(), 0);
    }

    #[test]
    fn test_pop_wakes_on_cross_thread_close() {
        let chan = FinalDeregChannel::new();
        let closer = chan.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            closer.close();
        });

        assert!(chan.pop_blocking().is_none());
        handle.join().unwrap();
    }
}

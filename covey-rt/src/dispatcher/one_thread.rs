// Layer 1: Standard library imports
use std::any::Any;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use super::error::DispatchError;
use super::work_thread::WorkThread;
use super::{Dispatcher, EventScheduler};

/// Dispatcher with a single worker thread shared by all bound agents.
///
/// The environment's default dispatcher is an instance of this kind.
/// Fairness: the worker serves ready agents round-robin, one event per
/// pick.
pub struct OneThreadDispatcher {
    thread: Arc<WorkThread>,
}

impl OneThreadDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            thread: WorkThread::new("covey-one-thread"),
        })
    }

    pub(crate) fn scheduler(&self) -> Arc<dyn EventScheduler> {
        Arc::clone(&self.thread) as Arc<dyn EventScheduler>
    }
}

impl Dispatcher for OneThreadDispatcher {
    fn start(&self) -> Result<(), DispatchError> {
        self.thread.start()
    }

    fn shutdown(&self) {
        self.thread.shutdown();
    }

    fn wait(&self) {
        self.thread.wait();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let disp = OneThreadDispatcher::new();
        disp.start().unwrap();
        disp.shutdown();
        disp.wait();
    }

    #[test]
    fn test_downcast_through_as_any() {
        let disp: Arc<dyn Dispatcher> = OneThreadDispatcher::new();
        assert!(disp.as_any().downcast_ref::<OneThreadDispatcher>().is_some());
    }
}

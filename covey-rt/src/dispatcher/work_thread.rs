// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

// Layer 2: Third-party crate imports
use parking_lot::{Condvar, Mutex};
use tracing::debug;

// Layer 3: Internal module imports
use super::error::DispatchError;
use super::EventScheduler;
use crate::agent::cell::AgentRef;

/// One worker serving a ready-list of agents round-robin.
///
/// All dispatcher variants are built from this: the one-thread dispatcher
/// owns a single instance shared by every bound agent, the active-object
/// dispatcher one instance per agent, the active-group dispatcher one per
/// group.
///
/// Each pick executes exactly one event of the picked agent; if the agent
/// still has demands afterwards the worker re-queues it at the back of the
/// ready-list. An agent appears in the ready-list at most once, guarded by
/// the agent's `scheduled` flag.
pub(crate) struct WorkThread {
    inner: Arc<WorkThreadInner>,
    join: Mutex<Option<JoinHandle<()>>>,
}

struct WorkThreadInner {
    name: String,
    state: Mutex<WorkState>,
    wakeup: Condvar,
}

struct WorkState {
    ready: VecDeque<AgentRef>,
    shutdown: bool,
}

impl WorkThread {
    pub(crate) fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(WorkThreadInner {
                name: name.into(),
                state: Mutex::new(WorkState {
                    ready: VecDeque::new(),
                    shutdown: false,
                }),
                wakeup: Condvar::new(),
            }),
            join: Mutex::new(None),
        })
    }

    pub(crate) fn start(&self) -> Result<(), DispatchError> {
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name(self.inner.name.clone())
            .spawn(move || inner.run())
            .map_err(|err| DispatchError::SpawnFailed(err.to_string()))?;
        *self.join.lock() = Some(handle);
        Ok(())
    }

    /// Request the worker to exit once its ready-list drains.
    pub(crate) fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        state.shutdown = true;
        self.inner.wakeup.notify_all();
    }

    /// Block until the worker thread exited.
    pub(crate) fn wait(&self) {
        let handle = self.join.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                debug!(worker = %self.inner.name, "worker thread terminated by panic");
            }
        }
    }

    fn push(&self, agent: AgentRef) {
        if agent.mark_scheduled() {
            let mut state = self.inner.state.lock();
            state.ready.push_back(agent);
            self.inner.wakeup.notify_one();
        }
    }
}

impl WorkThreadInner {
    fn run(&self) {
        loop {
            let agent = {
                let mut state = self.state.lock();
                loop {
                    if let Some(agent) = state.ready.pop_front() {
                        break agent;
                    }
                    if state.shutdown {
                        return;
                    }
                    self.wakeup.wait(&mut state);
                }
            };
            // Clearing the flag before executing lets producers re-queue
            // the agent for demands that arrive mid-execution.
            agent.clear_scheduled();
            if agent.exec_pick() && agent.mark_scheduled() {
                let mut state = self.state.lock();
                state.ready.push_back(agent);
            }
        }
    }
}

impl EventScheduler for WorkThread {
    fn schedule(&self, agent: &AgentRef, _demands: usize) {
        self.push(Arc::clone(agent));
    }
}

// Layer 1: Standard library imports
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tracing::warn;

// Layer 3: Internal module imports
use super::binder::DispBinder;
use super::error::DispatchError;
use super::work_thread::WorkThread;
use super::Dispatcher;
use crate::agent::cell::AgentRef;
use crate::env::environment::Environment;
use crate::util::AgentId;

/// Dispatcher with one worker thread per bound agent.
///
/// A `schedule` request for agent A wakes only A's worker; event order per
/// agent is strict FIFO. Workers are created at bind time and destroyed at
/// final deregistration.
pub struct ActiveObjDispatcher {
    state: Mutex<ActiveObjState>,
}

struct ActiveObjState {
    threads: HashMap<AgentId, Arc<WorkThread>>,
    shutdown_started: bool,
}

impl ActiveObjDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ActiveObjState {
                threads: HashMap::new(),
                shutdown_started: false,
            }),
        })
    }

    pub(crate) fn bind_agent(&self, agent: &AgentRef) -> Result<Arc<WorkThread>, DispatchError> {
        let mut state = self.state.lock();
        if state.shutdown_started {
            return Err(DispatchError::BindFailed(
                "active-object dispatcher is shutting down".to_string(),
            ));
        }
        let thread = WorkThread::new(format!("covey-active-obj-{}", agent.id()));
        thread.start()?;
        state.threads.insert(agent.id(), Arc::clone(&thread));
        Ok(thread)
    }

    pub(crate) fn unbind_agent(&self, agent_id: AgentId) {
        let thread = self.state.lock().threads.remove(&agent_id);
        if let Some(thread) = thread {
            thread.shutdown();
            thread.wait();
        }
    }
}

impl Dispatcher for ActiveObjDispatcher {
    fn start(&self) -> Result<(), DispatchError> {
        // Workers are created lazily at bind time.
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown_started = true;
        for thread in state.threads.values() {
            thread.shutdown();
        }
    }

    fn wait(&self) {
        let threads: Vec<Arc<WorkThread>> = self.state.lock().threads.values().cloned().collect();
        for thread in threads {
            thread.wait();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Binder attaching each agent of a cooperation to its own worker of a
/// named [`ActiveObjDispatcher`].
pub struct ActiveObjBinder {
    disp_name: String,
}

impl ActiveObjBinder {
    pub fn new(disp_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            disp_name: disp_name.into(),
        })
    }

    fn with_dispatcher<T>(
        &self,
        env: &Environment,
        action: impl FnOnce(&ActiveObjDispatcher) -> Result<T, DispatchError>,
    ) -> Result<T, DispatchError> {
        let disp = env
            .named_dispatcher(&self.disp_name)
            .ok_or_else(|| DispatchError::UnknownDispatcher(self.disp_name.clone()))?;
        let Some(active) = disp.as_any().downcast_ref::<ActiveObjDispatcher>() else {
            return Err(DispatchError::BindFailed(format!(
                "dispatcher '{}' is not an active-object dispatcher",
                self.disp_name
            )));
        };
        action(active)
    }
}

impl DispBinder for ActiveObjBinder {
    fn bind(&self, env: &Environment, agent: &AgentRef) -> Result<(), DispatchError> {
        let thread = self.with_dispatcher(env, |disp| disp.bind_agent(agent))?;
        agent.bind_scheduler(thread);
        Ok(())
    }

    fn unbind(&self, env: &Environment, agent: &AgentRef) {
        agent.unbind_scheduler();
        let outcome = self.with_dispatcher(env, |disp| {
            disp.unbind_agent(agent.id());
            Ok(())
        });
        if let Err(err) = outcome {
            warn!(%err, "active-object unbind could not resolve its dispatcher");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_rejects_new_binds() {
        let disp = ActiveObjDispatcher::new();
        disp.start().unwrap();
        disp.shutdown();
        disp.wait();

        let state = disp.state.lock();
        assert!(state.shutdown_started);
        assert!(state.threads.is_empty());
    }

    #[test]
    fn test_downcast_through_as_any() {
        let disp: Arc<dyn Dispatcher> = ActiveObjDispatcher::new();
        assert!(disp
            .as_any()
            .downcast_ref::<ActiveObjDispatcher>()
            .is_some());
    }
}

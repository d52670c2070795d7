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

/// Dispatcher with one worker thread per named group.
///
/// Agents carry a group name at bind time; every agent of a group shares
/// the group's worker. The worker is created when the first agent of the
/// group binds and destroyed when the last one unbinds.
pub struct ActiveGroupDispatcher {
    state: Mutex<ActiveGroupState>,
}

struct ActiveGroupState {
    groups: HashMap<String, GroupEntry>,
    shutdown_started: bool,
}

struct GroupEntry {
    thread: Arc<WorkThread>,
    users: usize,
}

impl ActiveGroupDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ActiveGroupState {
                groups: HashMap::new(),
                shutdown_started: false,
            }),
        })
    }

    /// Get the worker for `group`, starting it for the first user;
    /// increments the group's use count.
    pub(crate) fn query_disp_for_group(
        &self,
        group: &str,
    ) -> Result<Arc<WorkThread>, DispatchError> {
        let mut state = self.state.lock();
        if state.shutdown_started {
            return Err(DispatchError::BindFailed(
                "active-group dispatcher is shutting down".to_string(),
            ));
        }
        if let Some(entry) = state.groups.get_mut(group) {
            entry.users += 1;
            return Ok(Arc::clone(&entry.thread));
        }
        let thread = WorkThread::new(format!("covey-active-group-{group}"));
        thread.start()?;
        state.groups.insert(
            group.to_string(),
            GroupEntry {
                thread: Arc::clone(&thread),
                users: 1,
            },
        );
        Ok(thread)
    }

    /// Decrement the group's use count, destroying its worker at zero.
    pub(crate) fn release_disp_for_group(&self, group: &str) {
        let released = {
            let mut state = self.state.lock();
            match state.groups.get_mut(group) {
                Some(entry) => {
                    entry.users -= 1;
                    if entry.users == 0 {
                        state.groups.remove(group).map(|e| e.thread)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        if let Some(thread) = released {
            thread.shutdown();
            thread.wait();
        }
    }
}

impl Dispatcher for ActiveGroupDispatcher {
    fn start(&self) -> Result<(), DispatchError> {
        // Group workers are created lazily at bind time.
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown_started = true;
        for entry in state.groups.values() {
            entry.thread.shutdown();
        }
    }

    fn wait(&self) {
        let threads: Vec<Arc<WorkThread>> = self
            .state
            .lock()
            .groups
            .values()
            .map(|e| Arc::clone(&e.thread))
            .collect();
        for thread in threads {
            thread.wait();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Binder attaching agents to one group's worker of a named
/// [`ActiveGroupDispatcher`].
pub struct ActiveGroupBinder {
    disp_name: String,
    group_name: String,
}

impl ActiveGroupBinder {
    pub fn new(disp_name: impl Into<String>, group_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            disp_name: disp_name.into(),
            group_name: group_name.into(),
        })
    }

    fn with_dispatcher<T>(
        &self,
        env: &Environment,
        action: impl FnOnce(&ActiveGroupDispatcher) -> Result<T, DispatchError>,
    ) -> Result<T, DispatchError> {
        let disp = env
            .named_dispatcher(&self.disp_name)
            .ok_or_else(|| DispatchError::UnknownDispatcher(self.disp_name.clone()))?;
        let Some(grouped) = disp.as_any().downcast_ref::<ActiveGroupDispatcher>() else {
            return Err(DispatchError::BindFailed(format!(
                "dispatcher '{}' is not an active-group dispatcher",
                self.disp_name
            )));
        };
        action(grouped)
    }
}

impl DispBinder for ActiveGroupBinder {
    fn bind(&self, env: &Environment, agent: &AgentRef) -> Result<(), DispatchError> {
        let thread =
            self.with_dispatcher(env, |disp| disp.query_disp_for_group(&self.group_name))?;
        agent.bind_scheduler(thread);
        Ok(())
    }

    fn unbind(&self, env: &Environment, agent: &AgentRef) {
        agent.unbind_scheduler();
        let outcome = self.with_dispatcher(env, |disp| {
            disp.release_disp_for_group(&self.group_name);
            Ok(())
        });
        if let Err(err) = outcome {
            warn!(%err, "active-group unbind could not resolve its dispatcher");
        }
    }
}

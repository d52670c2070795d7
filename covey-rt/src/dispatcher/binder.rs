// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use super::error::DispatchError;
use super::one_thread::OneThreadDispatcher;
use crate::agent::cell::AgentRef;
use crate::env::environment::Environment;

/// Policy attaching agents to a dispatcher.
///
/// `bind` is called for each agent of a cooperation during registration; a
/// failure unwinds every earlier bind of the same cooperation and fails the
/// registration. `unbind` is called from the final-deregistration worker
/// and must not fail; a panic there is fatal for the process.
pub trait DispBinder: Send + Sync + 'static {
    /// Attach `agent` to the dispatcher this binder addresses.
    fn bind(&self, env: &Environment, agent: &AgentRef) -> Result<(), DispatchError>;

    /// Detach `agent` again at final deregistration.
    fn unbind(&self, env: &Environment, agent: &AgentRef);
}

/// Binder to the environment's default one-thread dispatcher.
///
/// Used by every cooperation that does not name a binder of its own.
pub struct DefaultDispBinder;

impl DefaultDispBinder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl DispBinder for DefaultDispBinder {
    fn bind(&self, env: &Environment, agent: &AgentRef) -> Result<(), DispatchError> {
        agent.bind_scheduler(env.default_dispatcher().scheduler());
        Ok(())
    }

    fn unbind(&self, _env: &Environment, agent: &AgentRef) {
        agent.unbind_scheduler();
    }
}

/// Binder to a named [`OneThreadDispatcher`].
pub struct OneThreadBinder {
    disp_name: String,
}

impl OneThreadBinder {
    pub fn new(disp_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            disp_name: disp_name.into(),
        })
    }

    fn resolve_scheduler(
        &self,
        env: &Environment,
    ) -> Result<Arc<dyn super::EventScheduler>, DispatchError> {
        let disp = env
            .named_dispatcher(&self.disp_name)
            .ok_or_else(|| DispatchError::UnknownDispatcher(self.disp_name.clone()))?;
        let Some(one_thread) = disp.as_any().downcast_ref::<OneThreadDispatcher>() else {
            return Err(DispatchError::BindFailed(format!(
                "dispatcher '{}' is not a one-thread dispatcher",
                self.disp_name
            )));
        };
        Ok(one_thread.scheduler())
    }
}

impl DispBinder for OneThreadBinder {
    fn bind(&self, env: &Environment, agent: &AgentRef) -> Result<(), DispatchError> {
        let scheduler = self.resolve_scheduler(env)?;
        agent.bind_scheduler(scheduler);
        Ok(())
    }

    fn unbind(&self, _env: &Environment, agent: &AgentRef) {
        agent.unbind_scheduler();
    }
}

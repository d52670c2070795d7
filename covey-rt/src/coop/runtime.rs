// Layer 1: Standard library imports
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tracing::trace;

// Layer 3: Internal module imports
use super::builder::{DeregNotificator, DeregReason, RegNotificator};
use crate::agent::cell::AgentRef;
use crate::agent::traits::ExceptionReaction;
use crate::dispatcher::binder::DispBinder;
use crate::env::environment::Environment;

/// One agent of a registered cooperation together with its binder.
pub(crate) struct AgentEntry {
    pub(crate) cell: AgentRef,
    pub(crate) binder: Arc<dyn DispBinder>,
}

/// The registered form of a cooperation.
///
/// Owned by the registry maps; agents hold a weak back-reference. The
/// usage counter carries one unit for the registration itself plus one per
/// started agent; it reaches zero only after every agent processed its
/// final event and phase A of deregistration dropped the registration
/// unit, at which point the cooperation is queued for final
/// deregistration.
pub(crate) struct CoopRuntime {
    name: String,
    self_ref: Weak<CoopRuntime>,
    parent: Option<String>,
    agents: Vec<AgentEntry>,
    usage: AtomicUsize,
    reaction: ExceptionReaction,
    reg_notificators: Vec<RegNotificator>,
    dereg_notificators: Vec<DeregNotificator>,
    dereg_reason: Mutex<Option<DeregReason>>,
}

impl CoopRuntime {
    pub(crate) fn new(
        name: String,
        parent: Option<String>,
        agents: Vec<AgentEntry>,
        reaction: ExceptionReaction,
        reg_notificators: Vec<RegNotificator>,
        dereg_notificators: Vec<DeregNotificator>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            name,
            self_ref: self_ref.clone(),
            parent,
            agents,
            usage: AtomicUsize::new(1),
            reaction,
            reg_notificators,
            dereg_notificators,
            dereg_reason: Mutex::new(None),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn agents(&self) -> &[AgentEntry] {
        &self.agents
    }

    pub(crate) fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub(crate) fn exception_reaction(&self) -> ExceptionReaction {
        self.reaction
    }

    pub(crate) fn reg_notificators(&self) -> &[RegNotificator] {
        &self.reg_notificators
    }

    pub(crate) fn dereg_notificators(&self) -> &[DeregNotificator] {
        &self.dereg_notificators
    }

    pub(crate) fn dereg_reason(&self) -> DeregReason {
        self.dereg_reason.lock().unwrap_or(DeregReason::Normal)
    }

    /// Registration start step: release each agent's queue with the start
    /// demand in front, taking one usage unit per agent.
    pub(crate) fn start_agents(&self) {
        for entry in &self.agents {
            self.usage.fetch_add(1, Ordering::AcqRel);
            entry.cell.release_start();
        }
    }

    /// Phase A of deregistration, run under the registry lock: record the
    /// reason, mark every agent and kick its worker, then drop the
    /// registration's usage unit.
    pub(crate) fn start_deregistration(&self, env: &Environment, reason: DeregReason) {
        {
            let mut stored = self.dereg_reason.lock();
            if stored.is_some() {
                return;
            }
            *stored = Some(reason);
        }
        trace!(coop = %self.name, %reason, "cooperation deregistration started");
        for entry in &self.agents {
            entry.cell.begin_deregistration();
        }
        self.decrement_usage(env);
    }

    /// Called by an agent after it processed its final event.
    pub(crate) fn agent_finished(&self, env: &Environment) {
        self.decrement_usage(env);
    }

    /// Take one usage unit; used when a child cooperation registers under
    /// this one.
    pub(crate) fn increment_usage(&self) {
        self.usage.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn decrement_usage(&self, env: &Environment) {
        if self.usage.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let Some(me) = self.self_ref.upgrade() {
                env.registry().ready_to_final_dereg(me);
            }
        }
    }

}

impl std::fmt::Debug for CoopRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoopRuntime")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("agents", &self.agents.len())
            .field("usage", &self.usage.load(Ordering::Relaxed))
            .finish()
    }
}

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

// Layer 3: Internal module imports
use super::launch::LaunchError;
use super::layer::Layer;
use super::params::EnvParams;
use crate::agent::traits::{Agent, ExceptionReaction};
use crate::coop::builder::{Coop, DeregReason};
use crate::dispatcher::one_thread::OneThreadDispatcher;
use crate::dispatcher::Dispatcher;
use crate::mailbox::mbox::{Mbox, MboxRef};
use crate::registry::core::{CoopRegistry, RegistryStats};
use crate::registry::error::RegistryError;

/// Handle to a running environment.
///
/// Cheap to clone; passed to every component that needs the runtime. The
/// environment owns the default dispatcher, the named dispatchers, the
/// mailbox name table and the cooperation registry, and coordinates
/// shutdown.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvInner>,
}

/// Weak back-reference to the environment, held by agent cells.
#[derive(Clone)]
pub(crate) struct EnvHandle(Weak<EnvInner>);

impl EnvHandle {
    pub(crate) fn upgrade(&self) -> Option<Environment> {
        self.0.upgrade().map(|inner| Environment { inner })
    }
}

struct StopState {
    stopped: bool,
    agent_fault: Option<String>,
}

pub(crate) struct EnvInner {
    default_disp: Arc<OneThreadDispatcher>,
    named_dispatchers: HashMap<String, Arc<dyn Dispatcher>>,
    named_mboxes: DashMap<String, MboxRef>,
    registry: CoopRegistry,
    layers: Vec<Arc<dyn Layer>>,
    message_tracing: bool,
    default_reaction: ExceptionReaction,
    stop_state: Mutex<StopState>,
    stopped_cond: Condvar,
}

impl Environment {
    pub(crate) fn new(params: EnvParams) -> Self {
        let EnvParams {
            named_dispatchers,
            layers,
            coop_listener,
            default_exception_reaction,
            message_tracing,
        } = params;
        Self {
            inner: Arc::new(EnvInner {
                default_disp: OneThreadDispatcher::new(),
                named_dispatchers,
                named_mboxes: DashMap::new(),
                registry: CoopRegistry::new(coop_listener),
                layers,
                message_tracing,
                default_reaction: default_exception_reaction,
                stop_state: Mutex::new(StopState {
                    stopped: false,
                    agent_fault: None,
                }),
                stopped_cond: Condvar::new(),
            }),
        }
    }

    // --- mailboxes ---------------------------------------------------------

    /// Create an anonymous multi-subscriber mailbox.
    pub fn create_mbox(&self) -> MboxRef {
        Mbox::multi(None, self.inner.message_tracing)
    }

    /// Get or create the mailbox registered under `name`.
    ///
    /// Every caller asking for the same name receives the same endpoint.
    pub fn create_named_mbox(&self, name: impl Into<String>) -> MboxRef {
        let name = name.into();
        self.inner
            .named_mboxes
            .entry(name.clone())
            .or_insert_with(|| Mbox::multi(Some(name), self.inner.message_tracing))
            .clone()
    }

    // --- cooperations ------------------------------------------------------

    /// Create a cooperation builder bound to the default dispatcher.
    pub fn create_coop(&self, name: impl Into<String>) -> Coop {
        Coop::new(name)
    }

    /// Create a cooperation builder with an explicit default binder.
    pub fn create_coop_with_binder(
        &self,
        name: impl Into<String>,
        binder: Arc<dyn crate::dispatcher::DispBinder>,
    ) -> Coop {
        Coop::with_binder(name, binder)
    }

    /// Register a cooperation.
    ///
    /// See the registry documentation for the atomicity contract. Must not
    /// be called from an agent's `define` hook.
    pub fn register_coop(&self, coop: Coop) -> Result<(), RegistryError> {
        self.inner.registry.register(self, coop)
    }

    /// Begin deregistration of the named cooperation and all its
    /// descendants.
    pub fn deregister_coop(&self, name: &str, reason: DeregReason) -> Result<(), RegistryError> {
        self.inner.registry.deregister(self, name, reason)
    }

    /// Register a single agent as a cooperation of its own.
    pub fn register_agent_as_coop(
        &self,
        name: impl Into<String>,
        agent: impl Agent,
    ) -> Result<(), RegistryError> {
        let mut coop = self.create_coop(name);
        coop.add_agent(agent);
        self.register_coop(coop)
    }

    /// Current registry population counters.
    pub fn registry_stats(&self) -> RegistryStats {
        self.inner.registry.stats()
    }

    // --- lifecycle ---------------------------------------------------------

    /// Request an orderly shutdown of the environment.
    ///
    /// Registration attempts fail with
    /// [`RegistryError::ShuttingDown`] from this point on; the launch
    /// thread then deregisters every remaining cooperation, drains the
    /// registry and stops the dispatchers.
    pub fn stop(&self) {
        self.inner.registry.refuse_new_registrations();
        let mut state = self.inner.stop_state.lock();
        if !state.stopped {
            debug!("environment stop requested");
            state.stopped = true;
            self.inner.stopped_cond.notify_all();
        }
    }

    pub(crate) fn wait_for_stop(&self) {
        let mut state = self.inner.stop_state.lock();
        while !state.stopped {
            self.inner.stopped_cond.wait(&mut state);
        }
    }

    pub(crate) fn record_agent_fault(&self, fault: String) {
        let mut state = self.inner.stop_state.lock();
        if state.agent_fault.is_none() {
            state.agent_fault = Some(fault);
        }
    }

    pub(crate) fn take_agent_fault(&self) -> Option<String> {
        self.inner.stop_state.lock().agent_fault.take()
    }

    pub(crate) fn start_runtime(&self) -> Result<(), LaunchError> {
        self.inner.default_disp.start()?;
        for dispatcher in self.inner.named_dispatchers.values() {
            dispatcher.start()?;
        }
        self.inner.registry.start(self)?;
        for layer in &self.inner.layers {
            layer
                .start(self)
                .map_err(|fault| LaunchError::LayerFailed(fault.to_string()))?;
        }
        Ok(())
    }

    /// Shutdown sequence: drain and close the registry, stop the layers,
    /// then stop every dispatcher.
    pub(crate) fn shutdown_runtime(&self) {
        self.inner.registry.finish(self);
        for layer in &self.inner.layers {
            layer.shutdown();
        }
        for layer in &self.inner.layers {
            layer.wait();
        }
        for dispatcher in self.inner.named_dispatchers.values() {
            dispatcher.shutdown();
        }
        for dispatcher in self.inner.named_dispatchers.values() {
            dispatcher.wait();
        }
        self.inner.default_disp.shutdown();
        self.inner.default_disp.wait();
        debug!("environment shut down");
    }

    // --- component access --------------------------------------------------

    pub(crate) fn default_dispatcher(&self) -> &Arc<OneThreadDispatcher> {
        &self.inner.default_disp
    }

    /// Resolve a dispatcher registered in the environment parameters.
    pub fn named_dispatcher(&self, name: &str) -> Option<Arc<dyn Dispatcher>> {
        self.inner.named_dispatchers.get(name).cloned()
    }

    pub(crate) fn registry(&self) -> &CoopRegistry {
        &self.inner.registry
    }

    pub(crate) fn message_tracing_enabled(&self) -> bool {
        self.inner.message_tracing
    }

    pub(crate) fn default_reaction(&self) -> ExceptionReaction {
        self.inner.default_reaction
    }

    pub(crate) fn handle(&self) -> EnvHandle {
        EnvHandle(Arc::downgrade(&self.inner))
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field(
                "named_dispatchers",
                &self.inner.named_dispatchers.keys().collect::<Vec<_>>(),
            )
            .field("named_mboxes", &self.inner.named_mboxes.len())
            .field("stats", &self.inner.registry.stats())
            .finish()
    }
}

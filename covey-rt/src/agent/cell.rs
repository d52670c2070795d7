// Layer 1: Standard library imports
use std::collections::HashMap;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use parking_lot::{Mutex, RwLock};
use tracing::{error, trace, warn};

// Layer 3: Internal module imports
use super::context::AgentContext;
use super::handlers::{CallerBlock, Invoke};
use super::queue::{Demand, EventQueue, PushOutcome};
use super::state::{State, StateListener, StateNotOwned};
use super::traits::{Agent, AgentFault, ExceptionReaction};
use crate::coop::runtime::CoopRuntime;
use crate::coop::DeregReason;
use crate::dispatcher::{EventScheduler, NoopScheduler};
use crate::env::environment::{EnvHandle, Environment};
use crate::mailbox::mbox::{Mbox, MboxRef};
use crate::message::envelope::Envelope;
use crate::message::TypeTag;
use crate::util::panics::{describe_panic, PanicFault};
use crate::util::{AgentId, MboxId};

/// Shared handle to an agent's runtime record.
pub type AgentRef = Arc<AgentCell>;

/// Key of one subscription in the agent-side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionKey {
    pub(crate) mbox: MboxId,
    pub(crate) tag: TypeTag,
}

struct CoopAttachment {
    runtime: Weak<CoopRuntime>,
    name: String,
}

/// Runtime-side record of one agent.
///
/// Hosts the event queue, subscription table and state machine, and
/// carries the binding to the dispatcher worker that executes the agent's
/// events. All fields are private; the embedding application only ever
/// sees the user-implemented [`Agent`] behavior and the [`AgentContext`]
/// handed into its hooks.
pub struct AgentCell {
    id: AgentId,
    self_ref: Weak<AgentCell>,
    behavior: Mutex<Box<dyn Agent>>,
    /// Reaction declared by `Agent::exception_reaction`, read once at
    /// construction so resolution never needs the behavior lock.
    declared_reaction: ExceptionReaction,
    reaction_override: Mutex<Option<ExceptionReaction>>,
    queue: EventQueue,
    scheduled: AtomicBool,
    default_state: State,
    current_state: Mutex<State>,
    state_listeners: Mutex<Vec<StateListener>>,
    subscriptions: Mutex<HashMap<SubscriptionKey, MboxRef>>,
    scheduler: RwLock<Arc<dyn EventScheduler>>,
    coop: RwLock<Option<CoopAttachment>>,
    direct: Mutex<Option<MboxRef>>,
    env: EnvHandle,
}

impl AgentCell {
    pub(crate) fn new(behavior: Box<dyn Agent>, env: &Environment) -> AgentRef {
        let id = AgentId::new();
        let default_state = State::default_for(id);
        let declared_reaction = behavior.exception_reaction();
        Arc::new_cyclic(|self_ref| Self {
            id,
            self_ref: self_ref.clone(),
            behavior: Mutex::new(behavior),
            declared_reaction,
            reaction_override: Mutex::new(None),
            queue: EventQueue::new(),
            scheduled: AtomicBool::new(false),
            current_state: Mutex::new(default_state.clone()),
            default_state,
            state_listeners: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(HashMap::new()),
            scheduler: RwLock::new(Arc::new(NoopScheduler)),
            coop: RwLock::new(None),
            direct: Mutex::new(None),
            env: env.handle(),
        })
    }

    /// The agent's unique id.
    pub fn id(&self) -> AgentId {
        self.id
    }

    fn strong_self(&self) -> Option<AgentRef> {
        self.self_ref.upgrade()
    }

    pub(crate) fn environment(&self) -> Option<Environment> {
        self.env.upgrade()
    }

    pub(crate) fn attach_to_coop(&self, coop: &Arc<CoopRuntime>) {
        *self.coop.write() = Some(CoopAttachment {
            runtime: Arc::downgrade(coop),
            name: coop.name().to_string(),
        });
    }

    pub(crate) fn coop_name(&self) -> Option<String> {
        self.coop.read().as_ref().map(|a| a.name.clone())
    }

    fn coop_runtime(&self) -> Option<Arc<CoopRuntime>> {
        self.coop.read().as_ref().and_then(|a| a.runtime.upgrade())
    }

    // --- dispatcher binding ------------------------------------------------

    pub(crate) fn bind_scheduler(&self, scheduler: Arc<dyn EventScheduler>) {
        *self.scheduler.write() = scheduler;
    }

    pub(crate) fn unbind_scheduler(&self) {
        *self.scheduler.write() = Arc::new(NoopScheduler);
    }

    pub(crate) fn schedule(&self, demands: usize) {
        let Some(me) = self.strong_self() else {
            return;
        };
        let scheduler = Arc::clone(&*self.scheduler.read());
        scheduler.schedule(&me, demands);
    }

    /// Claim a slot in the worker's ready list. Collapses with a prior
    /// unpicked schedule request.
    pub(crate) fn mark_scheduled(&self) -> bool {
        self.scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn clear_scheduled(&self) {
        self.scheduled.store(false, Ordering::Release);
    }

    // --- event intake ------------------------------------------------------

    pub(crate) fn push_event(&self, block: Arc<CallerBlock>, envelope: Arc<Envelope>) {
        match self.queue.push(Demand::Event { block, envelope }) {
            PushOutcome::BecameNonEmpty => self.schedule(1),
            PushOutcome::AlreadyPending => {}
            PushOutcome::Dropped => {
                trace!(agent = %self.id, "event dropped: agent already finished");
            }
        }
    }

    /// Registration start step: release the queue with the synthetic start
    /// demand at the front and wake the bound worker.
    pub(crate) fn release_start(&self) {
        self.queue.release_with_start();
        self.schedule(1);
    }

    /// Phase A of cooperation deregistration: mark the agent and kick its
    /// worker so an already-drained queue still reaches `on_finish`.
    pub(crate) fn begin_deregistration(&self) {
        if self.queue.mark_deregistration() {
            self.schedule(0);
        }
    }

    // --- worker side -------------------------------------------------------

    /// Execute at most one pending demand on the caller's thread.
    ///
    /// Returns `true` when demands remained after the pick and the agent
    /// must be re-queued by the worker.
    pub(crate) fn exec_pick(&self) -> bool {
        let Some(me) = self.strong_self() else {
            return false;
        };
        let Some(env) = self.environment() else {
            return false;
        };
        let picked = self.queue.pick();
        match picked.demand {
            Some(Demand::Start) => self.run_start(&me, &env),
            Some(Demand::Event { block, envelope }) => self.run_event(&me, &env, block, envelope),
            None => {}
        }
        if picked.remaining == 0 && picked.dereg_in_progress {
            self.finish_if_drained(&me, &env);
        }
        picked.remaining > 0
    }

    fn run_start(&self, me: &AgentRef, env: &Environment) {
        let mut behavior = self.behavior.lock();
        let outcome = {
            let mut ctx = AgentContext::new(me, env);
            catch_unwind(AssertUnwindSafe(|| behavior.on_start(&mut ctx)))
        };
        drop(behavior);
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(fault)) => self.react(env, fault),
            Err(payload) => {
                let fault = PanicFault(describe_panic(payload.as_ref()));
                self.react(env, Box::new(fault));
            }
        }
    }

    fn run_event(
        &self,
        me: &AgentRef,
        env: &Environment,
        block: Arc<CallerBlock>,
        envelope: Arc<Envelope>,
    ) {
        let current = self.current_state.lock().clone();
        let Some(caller) = block.select(&current) else {
            trace!(
                agent = %self.id,
                tag = %envelope.tag(),
                state = %current,
                "event dropped: no handler for current state"
            );
            return;
        };
        let mut behavior = self.behavior.lock();
        let outcome = {
            let mut ctx = AgentContext::new(me, env);
            catch_unwind(AssertUnwindSafe(|| {
                (*caller)(&mut **behavior, &mut ctx, &envelope)
            }))
        };
        drop(behavior);
        match outcome {
            Ok(Invoke::Done) => {}
            Ok(Invoke::Faulted(fault)) => self.react(env, fault),
            Err(payload) => {
                let rendered = describe_panic(payload.as_ref());
                if let Some(slot) = envelope.reply_slot() {
                    slot.fail(rendered);
                } else {
                    self.react(env, Box::new(PanicFault(rendered)));
                }
            }
        }
    }

    fn finish_if_drained(&self, me: &AgentRef, env: &Environment) {
        if !self.queue.try_finish() {
            return;
        }
        let mut behavior = self.behavior.lock();
        let outcome = {
            let mut ctx = AgentContext::new(me, env);
            catch_unwind(AssertUnwindSafe(|| behavior.on_finish(&mut ctx)))
        };
        drop(behavior);
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(fault)) => self.react(env, fault),
            Err(payload) => {
                let fault = PanicFault(describe_panic(payload.as_ref()));
                self.react(env, Box::new(fault));
            }
        }
        self.teardown_subscriptions();
        if let Some(coop) = self.coop_runtime() {
            coop.agent_finished(env);
        }
    }

    // --- registration side -------------------------------------------------

    /// Run the user's `define` hook on the registering thread.
    pub(crate) fn run_define(&self, env: &Environment) -> Result<(), String> {
        let Some(me) = self.strong_self() else {
            return Err("agent cell already released".to_string());
        };
        let mut behavior = self.behavior.lock();
        let outcome = {
            let mut ctx = AgentContext::new(&me, env);
            catch_unwind(AssertUnwindSafe(|| behavior.define(&mut ctx)))
        };
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(fault)) => Err(fault.to_string()),
            Err(payload) => Err(format!(
                "define panicked: {}",
                describe_panic(payload.as_ref())
            )),
        }
    }

    // --- subscriptions -----------------------------------------------------

    pub(crate) fn record_subscription(&self, key: SubscriptionKey, mbox: MboxRef) {
        self.subscriptions.lock().insert(key, mbox);
    }

    pub(crate) fn erase_subscription(&self, key: &SubscriptionKey) {
        self.subscriptions.lock().remove(key);
    }

    #[cfg(test)]
    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Remove this agent from every mailbox it subscribed to.
    pub(crate) fn teardown_subscriptions(&self) {
        let subscriptions = mem::take(&mut *self.subscriptions.lock());
        for (key, mbox) in subscriptions {
            mbox.drop_subscriber(key.tag, self.id);
        }
    }

    // --- state machine -----------------------------------------------------

    pub(crate) fn default_state(&self) -> State {
        self.default_state.clone()
    }

    pub(crate) fn current_state(&self) -> State {
        self.current_state.lock().clone()
    }

    pub(crate) fn change_state(&self, env: &Environment, new: &State) -> Result<(), StateNotOwned> {
        new.ensure_owned_by(self.id)?;
        {
            let mut current = self.current_state.lock();
            if *current == *new {
                return Ok(());
            }
            *current = new.clone();
        }
        self.notify_state_listeners(env, new);
        Ok(())
    }

    pub(crate) fn add_state_listener(&self, listener: StateListener) {
        self.state_listeners.lock().push(listener);
    }

    fn notify_state_listeners(&self, env: &Environment, state: &State) {
        // Listeners run outside the listener-list lock so they may install
        // further listeners.
        let listeners = mem::take(&mut *self.state_listeners.lock());
        for listener in &listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(state))) {
                let fault = PanicFault(describe_panic(payload.as_ref()));
                self.react(env, Box::new(fault));
            }
        }
        let mut guard = self.state_listeners.lock();
        let added = mem::take(&mut *guard);
        *guard = listeners;
        guard.extend(added);
    }

    // --- direct mailbox ----------------------------------------------------

    pub(crate) fn direct_mbox(&self, env: &Environment) -> MboxRef {
        let mut guard = self.direct.lock();
        if let Some(mbox) = &*guard {
            return Arc::clone(mbox);
        }
        let Some(me) = self.strong_self() else {
            // Unreachable while the agent is running; a throwaway endpoint
            // keeps the signature infallible.
            return Mbox::multi(None, env.message_tracing_enabled());
        };
        let mbox = Mbox::direct(&me, env.message_tracing_enabled());
        *guard = Some(Arc::clone(&mbox));
        mbox
    }

    // --- exception reactions -----------------------------------------------

    pub(crate) fn set_reaction_override(&self, reaction: ExceptionReaction) {
        *self.reaction_override.lock() = Some(reaction);
    }

    fn resolve_reaction(&self, env: &Environment) -> ExceptionReaction {
        let mut reaction = (*self.reaction_override.lock()).unwrap_or(self.declared_reaction);
        if reaction == ExceptionReaction::Inherit {
            if let Some(coop) = self.coop_runtime() {
                reaction = coop.exception_reaction();
            }
        }
        if reaction == ExceptionReaction::Inherit {
            reaction = env.default_reaction();
        }
        if reaction == ExceptionReaction::Inherit {
            reaction = ExceptionReaction::Abort;
        }
        reaction
    }

    pub(crate) fn react(&self, env: &Environment, fault: AgentFault) {
        match self.resolve_reaction(env) {
            ExceptionReaction::Abort | ExceptionReaction::Inherit => {
                error!(agent = %self.id, %fault, "unhandled agent fault; aborting process");
                std::process::abort();
            }
            ExceptionReaction::ShutdownEnvironment => {
                error!(agent = %self.id, %fault, "unhandled agent fault; shutting environment down");
                env.record_agent_fault(fault.to_string());
                env.stop();
            }
            ExceptionReaction::DeregisterCoop => {
                if let Some(name) = self.coop_name() {
                    error!(
                        agent = %self.id,
                        coop = %name,
                        %fault,
                        "unhandled agent fault; deregistering cooperation"
                    );
                    if let Err(err) = env.deregister_coop(&name, DeregReason::UnhandledException) {
                        warn!(coop = %name, %err, "deregistration after fault failed");
                    }
                }
            }
            ExceptionReaction::Ignore => {
                warn!(agent = %self.id, %fault, "agent fault ignored");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

impl std::fmt::Debug for AgentCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCell")
            .field("id", &self.id)
            .field("coop", &self.coop_name())
            .finish()
    }
}

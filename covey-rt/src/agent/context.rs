// Layer 1: Standard library imports
use std::any::Any;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tracing::{error, trace};

// Layer 3: Internal module imports
use super::cell::{AgentRef, SubscriptionKey};
use super::handlers::{settle_invocation, EventCaller, Invoke, StateFilter};
use super::state::{State, StateNotOwned};
use super::traits::{Agent, AgentResult, ExceptionReaction};
use crate::coop::DeregReason;
use crate::env::environment::Environment;
use crate::mailbox::error::MboxError;
use crate::mailbox::mbox::MboxRef;
use crate::message::envelope::Envelope;
use crate::message::{Message, Signal, TypeTag};
use crate::registry::error::RegistryError;
use crate::util::AgentId;

/// Handle passed into every agent hook and event handler.
///
/// Gives the running agent access to subscriptions, its state machine, its
/// direct mailbox and the environment. The context is only valid for the
/// duration of the hook invocation it was handed into.
pub struct AgentContext<'a> {
    cell: &'a AgentRef,
    env: &'a Environment,
}

impl<'a> AgentContext<'a> {
    pub(crate) fn new(cell: &'a AgentRef, env: &'a Environment) -> Self {
        Self { cell, env }
    }

    /// The environment this agent runs in.
    pub fn env(&self) -> &Environment {
        self.env
    }

    /// Id of the agent the context belongs to.
    pub fn agent_id(&self) -> AgentId {
        self.cell.id()
    }

    /// Name of the agent's cooperation; `None` before registration
    /// completes.
    pub fn coop_name(&self) -> Option<String> {
        self.cell.coop_name()
    }

    /// Create a state owned by this agent.
    pub fn state(&self, name: impl Into<String>) -> State {
        State::new(self.cell.id(), name)
    }

    /// The agent's built-in default state.
    pub fn default_state(&self) -> State {
        self.cell.default_state()
    }

    /// The agent's current state.
    pub fn current_state(&self) -> State {
        self.cell.current_state()
    }

    /// Switch the agent to `state`.
    ///
    /// The target must be owned by this agent. The transition is observable
    /// by every event processed afterwards, and each registered state
    /// listener is invoked once per committed transition. Switching to the
    /// current state is a no-op.
    pub fn change_state(&mut self, state: &State) -> Result<(), StateNotOwned> {
        self.cell.change_state(self.env, state)
    }

    /// Register a listener invoked after each committed state transition.
    pub fn add_state_listener<F>(&mut self, listener: F)
    where
        F: Fn(&State) + Send + 'static,
    {
        self.cell.add_state_listener(Box::new(listener));
    }

    /// The agent's direct mailbox, created lazily on first use.
    ///
    /// Its sole subscriber is this agent; any agent (including this one) may
    /// deliver to it.
    pub fn direct_mbox(&self) -> MboxRef {
        self.cell.direct_mbox(self.env)
    }

    /// Override the exception reaction declared by the behavior.
    pub fn set_exception_reaction(&mut self, reaction: ExceptionReaction) {
        self.cell.set_reaction_override(reaction);
    }

    /// Begin normal deregistration of this agent's cooperation.
    pub fn deregister_coop(&mut self) -> Result<(), RegistryError> {
        match self.cell.coop_name() {
            Some(name) => self.env.deregister_coop(&name, DeregReason::Normal),
            None => Ok(()),
        }
    }

    /// Start building a subscription on `mbox`.
    ///
    /// ```rust,ignore
    /// ctx.subscribe(&self.control).in_state(&st_active).event(Self::on_command)?;
    /// ```
    pub fn subscribe<'b>(&'b self, mbox: &'b MboxRef) -> SubscribeTo<'b> {
        SubscribeTo {
            cell: self.cell,
            mbox,
            filter: StateFilter::Any,
        }
    }

    /// Start building an unsubscription on `mbox`. Unsubscribing is
    /// idempotent: removing a subscription that does not exist is a no-op.
    pub fn unsubscribe<'b>(&'b self, mbox: &'b MboxRef) -> UnsubscribeFrom<'b> {
        UnsubscribeFrom {
            cell: self.cell,
            mbox,
            filter: StateFilter::Any,
        }
    }
}

/// Builder for one subscription, produced by [`AgentContext::subscribe`].
pub struct SubscribeTo<'a> {
    cell: &'a AgentRef,
    mbox: &'a MboxRef,
    filter: StateFilter,
}

impl SubscribeTo<'_> {
    /// Scope the subscription to one state of the subscribing agent.
    ///
    /// Without this call the subscription fires in every state.
    pub fn in_state(mut self, state: &State) -> Self {
        self.filter = StateFilter::Only(state.clone());
        self
    }

    /// Subscribe an event handler for payload messages of type `M`.
    ///
    /// The handler's return value is used as the reply when the delivery is
    /// a service request and discarded otherwise.
    pub fn event<A, M, R, F>(self, handler: F) -> Result<(), MboxError>
    where
        A: Agent,
        M: Message,
        R: Send + 'static,
        F: Fn(&mut A, &mut AgentContext<'_>, &M) -> AgentResult<R> + Send + Sync + 'static,
    {
        self.install(TypeTag::of::<M>(), make_event_caller::<A, M, R, F>(handler))
    }

    /// Subscribe a handler taking ownership of mutable messages of type `M`.
    pub fn event_mut<A, M, R, F>(self, handler: F) -> Result<(), MboxError>
    where
        A: Agent,
        M: Message,
        R: Send + 'static,
        F: Fn(&mut A, &mut AgentContext<'_>, M) -> AgentResult<R> + Send + Sync + 'static,
    {
        self.install(
            TypeTag::of::<M>(),
            make_mutable_caller::<A, M, R, F>(handler),
        )
    }

    /// Subscribe a handler for signals of type `S`.
    ///
    /// The signal type cannot be inferred from the handler; name it
    /// explicitly: `ctx.subscribe(&mbox).signal::<Tick, _, _, _>(Self::on_tick)`.
    pub fn signal<S, A, R, F>(self, handler: F) -> Result<(), MboxError>
    where
        S: Signal,
        A: Agent,
        R: Send + 'static,
        F: Fn(&mut A, &mut AgentContext<'_>) -> AgentResult<R> + Send + Sync + 'static,
    {
        self.install(TypeTag::of::<S>(), make_signal_caller::<A, R, F>(handler))
    }

    /// Subscribe a deadletter handler for messages of type `M`.
    ///
    /// Fires exactly once per delivery when no state-scoped subscription of
    /// this agent matches its current state.
    pub fn deadletter<A, M, R, F>(mut self, handler: F) -> Result<(), MboxError>
    where
        A: Agent,
        M: Message,
        R: Send + 'static,
        F: Fn(&mut A, &mut AgentContext<'_>, &M) -> AgentResult<R> + Send + Sync + 'static,
    {
        self.filter = StateFilter::Deadletter;
        self.install(TypeTag::of::<M>(), make_event_caller::<A, M, R, F>(handler))
    }

    /// Subscribe a deadletter handler for signals of type `S`.
    pub fn deadletter_signal<S, A, R, F>(mut self, handler: F) -> Result<(), MboxError>
    where
        S: Signal,
        A: Agent,
        R: Send + 'static,
        F: Fn(&mut A, &mut AgentContext<'_>) -> AgentResult<R> + Send + Sync + 'static,
    {
        self.filter = StateFilter::Deadletter;
        self.install(TypeTag::of::<S>(), make_signal_caller::<A, R, F>(handler))
    }

    fn install(self, tag: TypeTag, caller: EventCaller) -> Result<(), MboxError> {
        if let StateFilter::Only(state) = &self.filter {
            state.ensure_owned_by(self.cell.id())?;
        }
        self.mbox.subscribe(self.cell, self.filter, tag, caller)?;
        self.cell.record_subscription(
            SubscriptionKey {
                mbox: self.mbox.id(),
                tag,
            },
            Arc::clone(self.mbox),
        );
        Ok(())
    }
}

/// Builder for one unsubscription, produced by [`AgentContext::unsubscribe`].
pub struct UnsubscribeFrom<'a> {
    cell: &'a AgentRef,
    mbox: &'a MboxRef,
    filter: StateFilter,
}

impl UnsubscribeFrom<'_> {
    /// Select the state-scoped subscription to remove.
    pub fn in_state(mut self, state: &State) -> Self {
        self.filter = StateFilter::Only(state.clone());
        self
    }

    /// Remove the event subscription for messages of type `M`.
    pub fn event<M: Message>(self) {
        self.remove(TypeTag::of::<M>());
    }

    /// Remove the signal subscription for signals of type `S`.
    pub fn signal<S: Signal>(self) {
        self.remove(TypeTag::of::<S>());
    }

    /// Remove the deadletter subscription for type `T`.
    pub fn deadletter<T: 'static>(mut self) {
        self.filter = StateFilter::Deadletter;
        self.remove(TypeTag::of::<T>());
    }

    fn remove(self, tag: TypeTag) {
        let block_empty = self.mbox.unsubscribe(tag, self.cell.id(), &self.filter);
        if block_empty {
            self.cell.erase_subscription(&SubscriptionKey {
                mbox: self.mbox.id(),
                tag,
            });
        }
    }
}

fn make_event_caller<A, M, R, F>(handler: F) -> EventCaller
where
    A: Agent,
    M: Message,
    R: Send + 'static,
    F: Fn(&mut A, &mut AgentContext<'_>, &M) -> AgentResult<R> + Send + Sync + 'static,
{
    Arc::new(
        move |agent: &mut dyn Agent, ctx: &mut AgentContext<'_>, envelope: &Arc<Envelope>| {
            let any: &mut dyn Any = agent;
            let Some(target) = any.downcast_mut::<A>() else {
                error!(tag = %envelope.tag(), "subscribed agent has unexpected concrete type");
                return Invoke::Done;
            };
            if let Some(msg) = envelope.payload_ref::<M>() {
                settle_invocation(envelope, handler(target, ctx, msg))
            } else if let Some(msg) = envelope.take_mutable::<M>() {
                // A deadletter handler may face a mutable delivery; it still
                // observes the payload by reference.
                settle_invocation(envelope, handler(target, ctx, &msg))
            } else {
                trace!(tag = %envelope.tag(), "event dropped: payload form mismatch");
                if let Some(slot) = envelope.reply_slot() {
                    slot.fail("payload form mismatch");
                }
                Invoke::Done
            }
        },
    )
}

fn make_mutable_caller<A, M, R, F>(handler: F) -> EventCaller
where
    A: Agent,
    M: Message,
    R: Send + 'static,
    F: Fn(&mut A, &mut AgentContext<'_>, M) -> AgentResult<R> + Send + Sync + 'static,
{
    Arc::new(
        move |agent: &mut dyn Agent, ctx: &mut AgentContext<'_>, envelope: &Arc<Envelope>| {
            let any: &mut dyn Any = agent;
            let Some(target) = any.downcast_mut::<A>() else {
                error!(tag = %envelope.tag(), "subscribed agent has unexpected concrete type");
                return Invoke::Done;
            };
            let Some(msg) = envelope.take_mutable::<M>() else {
                trace!(tag = %envelope.tag(), "event dropped: not a mutable payload");
                if let Some(slot) = envelope.reply_slot() {
                    slot.fail("not a mutable payload");
                }
                return Invoke::Done;
            };
            settle_invocation(envelope, handler(target, ctx, *msg))
        },
    )
}

fn make_signal_caller<A, R, F>(handler: F) -> EventCaller
where
    A: Agent,
    R: Send + 'static,
    F: Fn(&mut A, &mut AgentContext<'_>) -> AgentResult<R> + Send + Sync + 'static,
{
    Arc::new(
        move |agent: &mut dyn Agent, ctx: &mut AgentContext<'_>, envelope: &Arc<Envelope>| {
            let any: &mut dyn Any = agent;
            let Some(target) = any.downcast_mut::<A>() else {
                error!(tag = %envelope.tag(), "subscribed agent has unexpected concrete type");
                return Invoke::Done;
            };
            settle_invocation(envelope, handler(target, ctx))
        },
    )
}

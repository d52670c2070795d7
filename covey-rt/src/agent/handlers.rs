// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::context::AgentContext;
use super::state::State;
use super::traits::{Agent, AgentFault, AgentResult};
use crate::message::envelope::Envelope;

/// State scoping of one subscription.
#[derive(Clone, Debug)]
pub(crate) enum StateFilter {
    /// Fires regardless of the agent's current state (subscription made
    /// without `.in_state(..)`).
    Any,
    /// Fires only while the agent is in the given state.
    Only(State),
    /// Fires when no other entry of the same caller block matched the
    /// current state.
    Deadletter,
}

impl StateFilter {
    pub(crate) fn matches(&self, current: &State) -> bool {
        match self {
            StateFilter::Any => true,
            StateFilter::Only(state) => state == current,
            StateFilter::Deadletter => false,
        }
    }

    pub(crate) fn same_slot(&self, other: &StateFilter) -> bool {
        match (self, other) {
            (StateFilter::Any, StateFilter::Any) => true,
            (StateFilter::Only(a), StateFilter::Only(b)) => a == b,
            (StateFilter::Deadletter, StateFilter::Deadletter) => true,
            _ => false,
        }
    }
}

/// Outcome of invoking one event caller.
pub(crate) enum Invoke {
    /// Handler ran (or the failure was absorbed into a reply slot).
    Done,
    /// Handler failed and the failure must go through the exception
    /// reaction.
    Faulted(AgentFault),
}

/// Type-erased event handler invoker.
///
/// Downcasts the agent to its concrete type and the envelope payload to the
/// subscribed message type, then calls the user handler.
pub(crate) type EventCaller =
    Arc<dyn Fn(&mut dyn Agent, &mut AgentContext<'_>, &Arc<Envelope>) -> Invoke + Send + Sync>;

/// All handlers one agent registered for one `(mailbox, type)` pair.
///
/// The mailbox keeps one caller block per subscribing agent, so a delivery
/// enqueues at most one event per agent; the block is consulted at dequeue
/// time to select the handler matching the agent's current state, falling
/// back to the deadletter entry.
pub(crate) struct CallerBlock {
    entries: Mutex<Vec<(StateFilter, EventCaller)>>,
}

impl CallerBlock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(Vec::new()),
        })
    }

    /// Add a handler entry. Returns `false` on a duplicate filter slot.
    pub(crate) fn add(&self, filter: StateFilter, caller: EventCaller) -> bool {
        let mut entries = self.entries.lock();
        if entries.iter().any(|(f, _)| f.same_slot(&filter)) {
            return false;
        }
        entries.push((filter, caller));
        true
    }

    /// Remove a handler entry. Idempotent.
    pub(crate) fn remove(&self, filter: &StateFilter) {
        self.entries.lock().retain(|(f, _)| !f.same_slot(filter));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Select the caller for the agent's current state, falling back to the
    /// deadletter entry.
    pub(crate) fn select(&self, current: &State) -> Option<EventCaller> {
        let entries = self.entries.lock();
        if let Some((_, caller)) = entries.iter().find(|(f, _)| f.matches(current)) {
            return Some(Arc::clone(caller));
        }
        entries
            .iter()
            .find(|(f, _)| matches!(f, StateFilter::Deadletter))
            .map(|(_, caller)| Arc::clone(caller))
    }
}

/// Route a handler result either into the envelope's reply slot (service
/// request) or into the exception-reaction path (plain event).
pub(crate) fn settle_invocation<R: Send + 'static>(
    envelope: &Arc<Envelope>,
    result: AgentResult<R>,
) -> Invoke {
    match envelope.reply_slot() {
        Some(slot) => {
            match result {
                Ok(reply) => slot.complete(Box::new(reply)),
                Err(fault) => slot.fail(fault.to_string()),
            }
            Invoke::Done
        }
        None => match result {
            Ok(_) => Invoke::Done,
            Err(fault) => Invoke::Faulted(fault),
        },
    }
}

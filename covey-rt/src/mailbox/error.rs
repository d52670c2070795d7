//! Mailbox error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::agent::state::StateNotOwned;
use crate::util::AgentId;

/// Errors raised by mailbox subscription and delivery operations.
#[derive(Debug, Error)]
pub enum MboxError {
    /// An identical `(agent, type, state)` subscription already exists on
    /// this mailbox.
    #[error("duplicate subscription of agent {agent} to {type_name}")]
    DuplicateSubscription {
        agent: AgentId,
        type_name: &'static str,
    },

    /// The subscription named a state owned by a different agent.
    #[error(transparent)]
    StateNotOwned(#[from] StateNotOwned),

    /// A mutable message needs exactly one subscriber; delivery with any
    /// other subscriber count, or subscribing to a type after a mutable
    /// delivery of it, is rejected.
    #[error("mutable message violation for {type_name}: {subscribers} subscriber(s)")]
    MutableMsgViolation {
        type_name: &'static str,
        subscribers: usize,
    },

    /// Only the owning agent may subscribe on its direct mailbox.
    #[error("direct mailbox of agent {owner} cannot accept subscriptions from agent {agent}")]
    ForeignAgentOnDirectMbox { owner: AgentId, agent: AgentId },
}

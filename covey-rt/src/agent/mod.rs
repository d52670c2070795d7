//! Agents: the units of single-threaded message-processing logic.
//!
//! # Components
//!
//! - [`Agent`] - User trait with the lifecycle hooks (`define`, `on_start`,
//!   `on_finish`) and the exception-reaction choice
//! - [`AgentContext`] - Handle passed into every hook and handler for
//!   subscriptions, state changes and environment access
//! - [`State`] - Named agent state; subscriptions can be scoped to one
//! - [`AgentCell`] - Runtime-side record hosting the event queue,
//!   subscription table and dispatcher binding
//!
//! # Execution model
//!
//! All hooks and handlers of one agent run on the worker of the dispatcher
//! the agent was bound to at registration, never concurrently with each
//! other. Agent internals therefore need no locking of their own.

pub mod cell;
pub mod context;
pub(crate) mod handlers;
pub(crate) mod queue;
pub mod state;
pub mod traits;

pub use cell::{AgentCell, AgentRef};
pub use context::{AgentContext, SubscribeTo, UnsubscribeFrom};
pub use state::{State, StateNotOwned};
pub use traits::{Agent, AgentFault, AgentResult, ExceptionReaction};

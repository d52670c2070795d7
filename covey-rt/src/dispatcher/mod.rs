//! Dispatchers: owners of the worker threads that execute agent events.
//!
//! # Components
//!
//! - [`Dispatcher`] - Lifecycle capability set (`start`/`shutdown`/`wait`)
//! - [`DispBinder`] - Policy attaching an agent to a dispatcher at
//!   registration and detaching it at final deregistration
//! - [`OneThreadDispatcher`] - One worker thread shared by all bound agents
//! - [`ActiveObjDispatcher`] - One worker thread per bound agent
//! - [`ActiveGroupDispatcher`] - One worker thread per named group
//!
//! # Scheduling
//!
//! Every worker serves a ready-list of agents round-robin and executes one
//! event per pick, so a long run of events for one agent cannot starve its
//! neighbours on a shared worker. An agent is bound to exactly one
//! dispatcher for its lifetime; at most one event of the same agent
//! executes at any instant.

pub mod active_group;
pub mod active_obj;
pub mod binder;
pub mod error;
pub mod one_thread;
pub(crate) mod work_thread;

// Layer 1: Standard library imports
use std::any::Any;

// Layer 3: Internal module imports
use crate::agent::cell::AgentRef;

pub use active_group::{ActiveGroupBinder, ActiveGroupDispatcher};
pub use active_obj::{ActiveObjBinder, ActiveObjDispatcher};
pub use binder::{DefaultDispBinder, DispBinder, OneThreadBinder};
pub use error::DispatchError;
pub use one_thread::OneThreadDispatcher;

/// Lifecycle capability set of a dispatcher.
///
/// Dispatchers are runtime-selected variants handed to the environment in
/// its parameters; binders resolve them by name and downcast through
/// [`as_any`](Dispatcher::as_any) to the concrete kind they know how to
/// bind to.
pub trait Dispatcher: Send + Sync + 'static {
    /// Launch the dispatcher's workers.
    fn start(&self) -> Result<(), DispatchError>;

    /// Non-blocking request to stop accepting work.
    fn shutdown(&self);

    /// Block until all workers exited.
    fn wait(&self);

    /// Downcast hook for binders.
    fn as_any(&self) -> &dyn Any;
}

/// Target an agent's events are scheduled onto once the agent is bound.
///
/// `schedule` marks the agent schedulable on the worker serving it; the
/// request is idempotent and collapses with a prior unpicked one.
pub(crate) trait EventScheduler: Send + Sync {
    fn schedule(&self, agent: &AgentRef, demands: usize);
}

/// Pre-binding stub: accepts schedule requests and drops them.
///
/// An agent's queue is released to a real worker only at the registration
/// start step, so nothing is lost while the stub is in place.
pub(crate) struct NoopScheduler;

impl EventScheduler for NoopScheduler {
    fn schedule(&self, _agent: &AgentRef, _demands: usize) {}
}

//! Prelude module for convenient imports.
//!
//! Re-exports the types most applications need:
//!
//! ```rust
//! use covey_rt::prelude::*;
//! ```
//!
//! # What's Included
//!
//! ## Agents
//! - [`Agent`] - Core trait with the lifecycle hooks
//! - [`AgentContext`] - Subscription/state/environment access in hooks
//! - [`AgentResult`] / [`AgentFault`] - Hook and handler outcomes
//! - [`State`] - Named agent state
//! - [`ExceptionReaction`] - Fault-handling policy
//!
//! ## Messaging
//! - [`Message`] / [`Signal`] - Marker traits for payload types
//! - [`Mbox`] / [`MboxRef`] - Publish/subscribe endpoints
//! - [`SvcError`] - Service-request outcomes
//!
//! ## Lifecycle
//! - [`Coop`] / [`DeregReason`] - Cooperation building and teardown
//! - [`Environment`] / [`EnvParams`] - The runtime container
//! - [`launch`] / [`launch_with_params`] - Bootstrap entry points
//!
//! ## Dispatchers
//! - [`ActiveObjDispatcher`] / [`ActiveObjBinder`]
//! - [`ActiveGroupDispatcher`] / [`ActiveGroupBinder`]
//! - [`OneThreadDispatcher`] / [`OneThreadBinder`] / [`DefaultDispBinder`]

pub use crate::agent::{
    Agent, AgentContext, AgentFault, AgentResult, ExceptionReaction, State,
};
pub use crate::coop::{Coop, DeregReason};
pub use crate::dispatcher::{
    ActiveGroupBinder, ActiveGroupDispatcher, ActiveObjBinder, ActiveObjDispatcher,
    DefaultDispBinder, DispBinder, OneThreadBinder, OneThreadDispatcher,
};
pub use crate::env::{launch, launch_with_params, EnvParams, Environment, LaunchError};
pub use crate::mailbox::{Mbox, MboxError, MboxRef};
pub use crate::message::{Message, Signal};
pub use crate::registry::RegistryError;
pub use crate::svc::SvcError;

//! Utility types shared across the runtime.
//!
//! # Components
//!
//! - [`AgentId`] - Unique identifier for agents
//! - [`MboxId`] - Unique identifier for mailboxes

pub mod ids;
pub(crate) mod panics;

pub use ids::{AgentId, MboxId};

//! Cooperations: atomically registered groups of agents.
//!
//! # Components
//!
//! - [`Coop`] - Builder collecting agents, binders, a parent name and
//!   notificators before registration
//! - [`DeregReason`] - Why a cooperation left the registry
//!
//! A cooperation is the unit of lifecycle: its agents are defined, bound
//! and started together, and deregistered together with every descendant
//! cooperation. A cooperation is immutable once passed to
//! [`Environment::register_coop`](crate::env::Environment::register_coop).

pub mod builder;
pub(crate) mod runtime;

pub use builder::{Coop, DeregNotificator, DeregReason, RegNotificator};

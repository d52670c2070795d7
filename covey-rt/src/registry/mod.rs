//! The cooperation registry.
//!
//! # Components
//!
//! - `CoopRegistry` (crate-internal) - Name tables, parent/child index and
//!   the two-phase deregistration machinery
//! - [`RegistryStats`] - Counters exposed through
//!   [`Environment::registry_stats`](crate::env::Environment::registry_stats)
//! - [`RegistryError`] - Registration and deregistration failures
//!
//! # Atomicity
//!
//! One mutex guards the `registered`, `deregistered` and `parent_child`
//! maps; transitions between them are atomic. Registration errors are
//! raised before any side effect is observable. Exceptions inside
//! registry-locked sections or the final-deregistration worker are fatal:
//! partial registry state is unrecoverable, so they log and abort.

pub(crate) mod core;
pub mod error;
pub(crate) mod final_dereg;

pub use self::core::RegistryStats;
pub use error::RegistryError;

pub(crate) use self::core::CoopRegistry;

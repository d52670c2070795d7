//! Synchronous service requests over mailboxes.
//!
//! A service request is a normal mailbox delivery whose envelope carries a
//! one-shot reply slot. The subscribed handler's return value (or its
//! failure) is stored in the slot and the waiting client is woken. Waiting
//! is bounded with [`RequestHandle::wait_for`] or unbounded with
//! [`RequestHandle::wait_forever`].
//!
//! # Components
//!
//! - [`RequestHandle`] - Client-side handle for collecting the reply
//! - [`SvcError`] - Timeout and handler-failure reporting
//!
//! # Deadlocks
//!
//! A request issued from an agent's own worker towards an agent served by
//! the same worker can never complete; `wait_for` is the only safe mode in
//! such setups. `wait_forever` under that cycle is a caller error the
//! runtime cannot detect.

pub mod error;
pub mod request;
pub(crate) mod slot;

pub use error::SvcError;
pub use request::RequestHandle;

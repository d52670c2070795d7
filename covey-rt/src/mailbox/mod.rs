//! Mailboxes: typed publish/subscribe endpoints.
//!
//! # Components
//!
//! - [`Mbox`] / [`MboxRef`] - The endpoint; *multi* (any agent subscribes)
//!   or *direct* (sole subscriber is the owning agent)
//! - [`MboxError`] - Subscription and mutable-delivery violations
//!
//! # Delivery contract
//!
//! `deliver` runs synchronously in the caller's thread: it walks the
//! per-type subscriber list and pushes one event onto each subscribing
//! agent's queue. Deliveries issued from a single thread to a single
//! mailbox appear in issue order on every subscriber's queue. The mailbox
//! lock is released before any subscriber-side enqueue, so delivery never
//! holds two of the runtime's locks at once.

pub mod error;
pub mod mbox;

pub use error::MboxError;
pub use mbox::{Mbox, MboxRef};

//! Message types, type tags and delivery envelopes.
//!
//! # Components
//!
//! - [`Message`] - Marker trait for payload-carrying message types
//! - [`Signal`] - Marker trait for payload-less signal types
//! - [`TypeTag`] - Stable runtime identity of a message/signal type
//! - [`Envelope`] - The unit actually travelling through mailboxes
//!
//! # Design Philosophy
//!
//! Mailboxes dispatch on runtime type identity, not on a per-mailbox sum
//! type. Every payload type gets a stable opaque tag ([`TypeTag`], backed by
//! `std::any::TypeId`), subscriber lists are keyed on that tag, and handlers
//! are stored as type-erased callables that downcast internally.

pub mod envelope;
pub mod traits;

pub use envelope::Envelope;
pub use traits::{Message, Signal, TypeTag};

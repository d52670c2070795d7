// Layer 1: Standard library imports
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::traits::{Message, Signal, TypeTag};
use crate::svc::slot::ReplySlot;

/// The unit travelling through mailboxes.
///
/// An envelope is created once per delivery and shared (behind `Arc`) by
/// every subscribing agent's event queue. It couples the payload with its
/// type tag and, for service requests, with the one-shot reply slot.
pub struct Envelope {
    tag: TypeTag,
    payload: Payload,
    reply_slot: Option<Arc<ReplySlot>>,
}

pub(crate) enum Payload {
    /// A payload message, shared by reference between subscribers.
    Instance(Arc<dyn Any + Send + Sync>),
    /// A mutable message: exclusive ownership, taken by the sole subscriber.
    Mutable(Mutex<Option<Box<dyn Any + Send>>>),
    /// A signal; only the type tag matters.
    Signal,
}

impl Envelope {
    pub(crate) fn message<M: Message>(msg: M) -> Self {
        Self {
            tag: TypeTag::of::<M>(),
            payload: Payload::Instance(Arc::new(msg)),
            reply_slot: None,
        }
    }

    pub(crate) fn mutable_message<M: Message>(msg: M) -> Self {
        Self {
            tag: TypeTag::of::<M>(),
            payload: Payload::Mutable(Mutex::new(Some(Box::new(msg)))),
            reply_slot: None,
        }
    }

    pub(crate) fn signal<S: Signal>() -> Self {
        Self {
            tag: TypeTag::of::<S>(),
            payload: Payload::Signal,
            reply_slot: None,
        }
    }

    pub(crate) fn with_reply_slot(mut self, slot: Arc<ReplySlot>) -> Self {
        self.reply_slot = Some(slot);
        self
    }

    pub(crate) fn tag(&self) -> TypeTag {
        self.tag
    }

    pub(crate) fn reply_slot(&self) -> Option<&Arc<ReplySlot>> {
        self.reply_slot.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn is_signal(&self) -> bool {
        matches!(self.payload, Payload::Signal)
    }

    /// Borrow the shared payload as `M`. `None` for signals, mutable
    /// payloads and tag mismatches.
    pub(crate) fn payload_ref<M: Message>(&self) -> Option<&M> {
        match &self.payload {
            Payload::Instance(any) => any.downcast_ref::<M>(),
            _ => None,
        }
    }

    /// Take the mutable payload out of the envelope.
    ///
    /// Returns `None` if the payload was already taken, is not mutable, or
    /// is not an `M`.
    pub(crate) fn take_mutable<M: Message>(&self) -> Option<Box<M>> {
        match &self.payload {
            Payload::Mutable(cell) => {
                let mut guard = cell.lock();
                let boxed = guard.take()?;
                match boxed.downcast::<M>() {
                    Ok(msg) => Some(msg),
                    Err(other) => {
                        *guard = Some(other);
                        None
                    }
                }
            }
            _ => None,
        }
    }
}

impl Drop for Envelope {
    /// A service request that dies unhandled must not strand its client:
    /// when the last reference to the envelope goes away with the slot
    /// still pending, the slot is failed.
    fn drop(&mut self) {
        if let Some(slot) = &self.reply_slot {
            if slot.is_pending() {
                slot.fail("request was not handled");
            }
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.payload {
            Payload::Instance(_) => "message",
            Payload::Mutable(_) => "mutable",
            Payload::Signal => "signal",
        };
        f.debug_struct("Envelope")
            .field("tag", &self.tag.name())
            .field("kind", &kind)
            .field("service_request", &self.reply_slot.is_some())
            .finish()
    }
}

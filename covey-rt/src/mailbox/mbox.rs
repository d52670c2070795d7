// Layer 1: Standard library imports
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tracing::trace;

// Layer 3: Internal module imports
use super::error::MboxError;
use crate::agent::cell::{AgentCell, AgentRef};
use crate::agent::handlers::{CallerBlock, EventCaller, StateFilter};
use crate::message::envelope::Envelope;
use crate::message::{Message, Signal, TypeTag};
use crate::svc::request::RequestHandle;
use crate::svc::slot::ReplySlot;
use crate::util::{AgentId, MboxId};

/// Shared handle to a mailbox.
pub type MboxRef = Arc<Mbox>;

enum MboxKind {
    /// Any agent may subscribe.
    Multi,
    /// Sole subscriber is the owning agent.
    Direct(AgentId),
}

/// A typed publish/subscribe endpoint.
///
/// Holds, per message type, an ordered list of subscribing agents; each
/// list entry carries the agent's caller block so one delivery enqueues at
/// most one event per subscriber. Create mailboxes through
/// [`Environment::create_mbox`](crate::env::Environment::create_mbox),
/// [`Environment::create_named_mbox`](crate::env::Environment::create_named_mbox)
/// or [`AgentContext::direct_mbox`](crate::agent::AgentContext::direct_mbox).
pub struct Mbox {
    id: MboxId,
    name: Option<String>,
    kind: MboxKind,
    tracing_enabled: bool,
    state: Mutex<MboxState>,
}

struct MboxState {
    by_type: HashMap<TypeTag, Vec<SubscriberLink>>,
    /// Types that saw a mutable delivery; further subscriptions to them are
    /// rejected.
    mutable_delivered: HashSet<TypeTag>,
}

struct SubscriberLink {
    agent_id: AgentId,
    agent: Weak<AgentCell>,
    block: Arc<CallerBlock>,
}

impl Mbox {
    pub(crate) fn multi(name: Option<String>, tracing_enabled: bool) -> MboxRef {
        Arc::new(Self {
            id: MboxId::new(),
            name,
            kind: MboxKind::Multi,
            tracing_enabled,
            state: Mutex::new(MboxState {
                by_type: HashMap::new(),
                mutable_delivered: HashSet::new(),
            }),
        })
    }

    pub(crate) fn direct(owner: &AgentRef, tracing_enabled: bool) -> MboxRef {
        Arc::new(Self {
            id: MboxId::new(),
            name: None,
            kind: MboxKind::Direct(owner.id()),
            tracing_enabled,
            state: Mutex::new(MboxState {
                by_type: HashMap::new(),
                mutable_delivered: HashSet::new(),
            }),
        })
    }

    /// The mailbox's unique id.
    pub fn id(&self) -> MboxId {
        self.id
    }

    /// The registered name, for mailboxes shared by name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    // --- delivery ----------------------------------------------------------

    /// Deliver a payload message to every subscriber of its type.
    ///
    /// Synchronous in the caller's thread; a delivery with no subscribers
    /// is silently dropped.
    pub fn deliver<M: Message>(&self, msg: M) {
        self.deliver_envelope(Envelope::message(msg));
    }

    /// Deliver a signal of type `S`.
    pub fn deliver_signal<S: Signal>(&self) {
        self.deliver_envelope(Envelope::signal::<S>());
    }

    /// Deliver a mutable message, transferring exclusive ownership.
    ///
    /// Valid only while exactly one agent subscribes to `M` on this
    /// mailbox.
    pub fn deliver_mutable<M: Message>(&self, msg: M) -> Result<(), MboxError> {
        let tag = TypeTag::of::<M>();
        {
            let mut state = self.state.lock();
            let subscribers = state
                .by_type
                .get(&tag)
                .map(|links| links.iter().filter(|l| l.agent.strong_count() > 0).count())
                .unwrap_or(0);
            if subscribers != 1 {
                return Err(MboxError::MutableMsgViolation {
                    type_name: tag.name(),
                    subscribers,
                });
            }
            state.mutable_delivered.insert(tag);
        }
        self.deliver_envelope(Envelope::mutable_message(msg));
        Ok(())
    }

    /// Issue a synchronous service request carrying `msg`.
    ///
    /// The request is delivered through the normal mailbox path; the
    /// returned handle waits for the subscribed handler's reply of type
    /// `R`.
    pub fn request<R: Send + 'static, M: Message>(&self, msg: M) -> RequestHandle<R> {
        let slot = ReplySlot::new();
        self.deliver_envelope(Envelope::message(msg).with_reply_slot(Arc::clone(&slot)));
        RequestHandle::new(slot)
    }

    /// Issue a synchronous service request conveyed by a signal of type
    /// `S`.
    pub fn request_signal<R: Send + 'static, S: Signal>(&self) -> RequestHandle<R> {
        let slot = ReplySlot::new();
        self.deliver_envelope(Envelope::signal::<S>().with_reply_slot(Arc::clone(&slot)));
        RequestHandle::new(slot)
    }

    fn deliver_envelope(&self, envelope: Envelope) {
        let tag = envelope.tag();
        let envelope = Arc::new(envelope);
        // Collect targets under the mailbox lock, enqueue after releasing
        // it: the subscriber-side enqueue takes the agent's queue lock only.
        let targets: Vec<(AgentRef, Arc<CallerBlock>)> = {
            let state = self.state.lock();
            match state.by_type.get(&tag) {
                Some(links) => links
                    .iter()
                    .filter_map(|link| {
                        link.agent
                            .upgrade()
                            .map(|agent| (agent, Arc::clone(&link.block)))
                    })
                    .collect(),
                None => Vec::new(),
            }
        };
        if self.tracing_enabled {
            trace!(
                mbox = %self.id,
                name = self.name.as_deref().unwrap_or("<anonymous>"),
                tag = %tag,
                subscribers = targets.len(),
                service_request = envelope.reply_slot().is_some(),
                "delivering"
            );
        }
        for (agent, block) in targets {
            agent.push_event(block, Arc::clone(&envelope));
        }
    }

    // --- subscription management -------------------------------------------

    pub(crate) fn subscribe(
        &self,
        agent: &AgentRef,
        filter: StateFilter,
        tag: TypeTag,
        caller: EventCaller,
    ) -> Result<(), MboxError> {
        if let MboxKind::Direct(owner) = self.kind {
            if owner != agent.id() {
                return Err(MboxError::ForeignAgentOnDirectMbox {
                    owner,
                    agent: agent.id(),
                });
            }
        }
        let mut state = self.state.lock();
        if state.mutable_delivered.contains(&tag) {
            let subscribers = state.by_type.get(&tag).map_or(0, Vec::len);
            return Err(MboxError::MutableMsgViolation {
                type_name: tag.name(),
                subscribers,
            });
        }
        let links = state.by_type.entry(tag).or_default();
        let index = match links.iter().position(|l| l.agent_id == agent.id()) {
            Some(index) => index,
            None => {
                links.push(SubscriberLink {
                    agent_id: agent.id(),
                    agent: Arc::downgrade(agent),
                    block: CallerBlock::new(),
                });
                links.len() - 1
            }
        };
        if !links[index].block.add(filter, caller) {
            return Err(MboxError::DuplicateSubscription {
                agent: agent.id(),
                type_name: tag.name(),
            });
        }
        Ok(())
    }

    /// Remove one `(agent, type, state)` subscription. Idempotent.
    ///
    /// Returns `true` when the agent's caller block for this type became
    /// empty and was removed.
    pub(crate) fn unsubscribe(&self, tag: TypeTag, agent: AgentId, filter: &StateFilter) -> bool {
        let mut state = self.state.lock();
        let Some(links) = state.by_type.get_mut(&tag) else {
            return false;
        };
        let Some(index) = links.iter().position(|l| l.agent_id == agent) else {
            return false;
        };
        links[index].block.remove(filter);
        if links[index].block.is_empty() {
            links.remove(index);
            if links.is_empty() {
                state.by_type.remove(&tag);
            }
            return true;
        }
        false
    }

    /// Remove every subscription of `agent` for `tag`; used during agent
    /// teardown.
    pub(crate) fn drop_subscriber(&self, tag: TypeTag, agent: AgentId) {
        let mut state = self.state.lock();
        if let Some(links) = state.by_type.get_mut(&tag) {
            links.retain(|l| l.agent_id != agent);
            if links.is_empty() {
                state.by_type.remove(&tag);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self, tag: TypeTag) -> usize {
        self.state.lock().by_type.get(&tag).map_or(0, Vec::len)
    }
}

impl fmt::Debug for Mbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mbox")
            .field("id", &self.id)
            .field("name", &self.name)
            .field(
                "kind",
                &match self.kind {
                    MboxKind::Multi => "multi",
                    MboxKind::Direct(_) => "direct",
                },
            )
            .finish()
    }
}

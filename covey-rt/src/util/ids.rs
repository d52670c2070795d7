// Layer 1: Standard library imports
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Namespace of an [`Id`], tying the identifier to the kind of entity it
/// names.
pub trait IdSpace {
    /// Short label prefixed to `Debug` output.
    const LABEL: &'static str;
}

/// Identifier namespace for agents.
pub enum AgentSpace {}

impl IdSpace for AgentSpace {
    const LABEL: &'static str = "agent";
}

/// Identifier namespace for mailboxes.
pub enum MboxSpace {}

impl IdSpace for MboxSpace {
    const LABEL: &'static str = "mbox";
}

/// Process-unique identifier of an agent.
pub type AgentId = Id<AgentSpace>;

/// Process-unique identifier of a mailbox.
pub type MboxId = Id<MboxSpace>;

/// UUID-backed identifier parameterized by the namespace it belongs to.
///
/// The namespace exists only at the type level: an [`AgentId`] and an
/// [`MboxId`] share their representation but cannot be compared, assigned
/// or mixed up as map keys. Subscription tables key on these values, so an
/// id denotes the same entity for the whole process lifetime.
///
/// ```rust
/// use covey_rt::util::{AgentId, MboxId};
///
/// let subscriber = AgentId::new();
/// let endpoint = MboxId::new();
/// assert_ne!(subscriber, AgentId::new());
/// assert_ne!(endpoint, MboxId::new());
/// ```
pub struct Id<Space> {
    value: Uuid,
    _space: PhantomData<fn() -> Space>,
}

impl<Space> Id<Space> {
    /// Mint a fresh identifier.
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Adopt an existing UUID into this namespace.
    pub fn from_uuid(value: Uuid) -> Self {
        Self {
            value,
            _space: PhantomData,
        }
    }

    /// The raw UUID behind the identifier.
    pub fn uuid(self) -> Uuid {
        self.value
    }
}

impl<Space> Default for Id<Space> {
    fn default() -> Self {
        Self::new()
    }
}

// The namespace parameter is phantom; none of these impls may demand
// anything of it, which rules out deriving.

impl<Space> Clone for Id<Space> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Space> Copy for Id<Space> {}

impl<Space> PartialEq for Id<Space> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<Space> Eq for Id<Space> {}

impl<Space> Hash for Id<Space> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<Space: IdSpace> fmt::Debug for Id<Space> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", Space::LABEL, self.value)
    }
}

impl<Space> fmt::Display for Id<Space> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<Space> Serialize for Id<Space> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, Space> Deserialize<'de> for Id<Space> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

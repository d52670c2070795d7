// Layer 1: Standard library imports
use std::any::{self, TypeId};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
// (none)

/// Marker trait for payload-carrying message types.
///
/// A message is delivered by shared reference: one instance is wrapped into
/// an envelope and every subscriber's handler sees `&M`. The only exception
/// is the mutable delivery path (`deliver_mutable`), which transfers
/// exclusive ownership and is restricted to single-subscriber setups.
///
/// # Example
/// ```rust
/// use covey_rt::message::Message;
///
/// #[derive(Debug)]
/// struct PriceUpdate {
///     instrument: String,
///     price: f64,
/// }
///
/// impl Message for PriceUpdate {}
/// ```
pub trait Message: Send + Sync + 'static {}

/// Marker trait for signal types.
///
/// A signal conveys only its type identity; no instance is ever constructed
/// or delivered. Handlers subscribed to a signal receive no payload argument.
///
/// # Example
/// ```rust
/// use covey_rt::message::Signal;
///
/// struct Tick;
///
/// impl Signal for Tick {}
/// ```
pub trait Signal: 'static {}

/// Stable runtime identity of a message or signal type.
///
/// Wraps `std::any::TypeId` together with the type name for diagnostics.
/// Equality and hashing consider only the `TypeId`, so two tags obtained for
/// the same type in different places always compare equal.
///
/// # Example
/// ```rust
/// use covey_rt::message::TypeTag;
///
/// struct Ping;
///
/// let a = TypeTag::of::<Ping>();
/// let b = TypeTag::of::<Ping>();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Obtain the tag for a type.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    /// The diagnostic name of the tagged type.
    ///
    /// Not guaranteed to be unique or stable across compiler versions; use
    /// only for logging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The underlying `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MsgA;
    struct MsgB;

    #[test]
    fn test_same_type_same_tag() {
        assert_eq!(TypeTag::of::<MsgA>(), TypeTag::of::<MsgA>());
    }

    #[test]
    fn test_different_types_different_tags() {
        assert_ne!(TypeTag::of::<MsgA>(), TypeTag::of::<MsgB>());
    }

    #[test]
    fn test_tag_usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(TypeTag::of::<MsgA>(), 1);
        map.insert(TypeTag::of::<MsgB>(), 2);

        assert_eq!(map.get(&TypeTag::of::<MsgA>()), Some(&1));
        assert_eq!(map.get(&TypeTag::of::<MsgB>()), Some(&2));
    }

    #[test]
    fn test_tag_name_contains_type() {
        let tag = TypeTag::of::<MsgA>();
        assert!(tag.name().contains("MsgA"));
        assert!(format!("{tag}").contains("MsgA"));
    }
}

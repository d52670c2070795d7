// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::AgentId;

/// Name of the state every agent starts in.
pub const DEFAULT_STATE_NAME: &str = "<default>";

/// A named agent state.
///
/// Every state is owned by exactly one agent; subscriptions scoped with
/// `.in_state(..)` and [`change_state`](crate::agent::AgentContext::change_state)
/// both verify ownership. States are cheap-clone handles; two handles are
/// equal when owner and name match.
///
/// States are created through the agent context, usually inside `define`:
///
/// ```rust,ignore
/// fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
///     self.st_busy = Some(ctx.state("busy"));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct State {
    inner: Arc<StateInner>,
}

struct StateInner {
    owner: AgentId,
    name: String,
}

impl State {
    pub(crate) fn new(owner: AgentId, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StateInner {
                owner,
                name: name.into(),
            }),
        }
    }

    pub(crate) fn default_for(owner: AgentId) -> Self {
        Self::new(owner, DEFAULT_STATE_NAME)
    }

    /// The state's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Id of the owning agent.
    pub fn owner(&self) -> AgentId {
        self.inner.owner
    }

    /// Is this the owning agent's default state?
    pub fn is_default(&self) -> bool {
        self.inner.name == DEFAULT_STATE_NAME
    }

    pub(crate) fn ensure_owned_by(&self, agent: AgentId) -> Result<(), StateNotOwned> {
        if self.inner.owner == agent {
            Ok(())
        } else {
            Err(StateNotOwned {
                state: self.inner.name.clone(),
                owner: self.inner.owner,
                agent,
            })
        }
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.inner.owner == other.inner.owner && self.inner.name == other.inner.name
    }
}

impl Eq for State {}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.inner.name)
            .field("owner", &self.inner.owner)
            .finish()
    }
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}

/// A state was used by an agent that does not own it.
#[derive(Debug, Error)]
#[error("state '{state}' belongs to agent {owner}, not to agent {agent}")]
pub struct StateNotOwned {
    state: String,
    owner: AgentId,
    agent: AgentId,
}

/// Callback invoked after each committed state transition of one agent.
///
/// Listeners observe committed transitions only; there is no rollback. A
/// panicking listener is routed through the agent's exception reaction.
pub type StateListener = Box<dyn Fn(&State) + Send>;

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_state_equality_by_owner_and_name() {
        let owner = AgentId::new();
        let a = State::new(owner, "busy");
        let b = State::new(owner, "busy");
        let c = State::new(owner, "idle");
        let foreign = State::new(AgentId::new(), "busy");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, foreign);
    }

    #[test]
    fn test_default_state() {
        let owner = AgentId::new();
        let st = State::default_for(owner);

        assert!(st.is_default());
        assert_eq!(st.owner(), owner);
    }

    #[test]
    fn test_ownership_check() {
        let owner = AgentId::new();
        let stranger = AgentId::new();
        let st = State::new(owner, "busy");

        assert!(st.ensure_owned_by(owner).is_ok());
        let err = st.ensure_owned_by(stranger).unwrap_err();
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn test_clone_is_same_state() {
        let st = State::new(AgentId::new(), "busy");
        let cloned = st.clone();

        assert_eq!(st, cloned);
        assert_eq!(format!("{st}"), "busy");
    }
}

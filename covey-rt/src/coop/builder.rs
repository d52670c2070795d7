// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use crate::agent::traits::{Agent, ExceptionReaction};
use crate::dispatcher::binder::{DefaultDispBinder, DispBinder};
use crate::env::environment::Environment;
use crate::registry::error::RegistryError;

/// Why a cooperation was deregistered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeregReason {
    /// Ordinary application-initiated deregistration.
    Normal,
    /// The environment is shutting down.
    Shutdown,
    /// The cooperation's parent began deregistration.
    ParentDeregistration,
    /// An agent fault with the deregister-cooperation reaction.
    UnhandledException,
}

impl Display for DeregReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeregReason::Normal => "normal",
            DeregReason::Shutdown => "shutdown",
            DeregReason::ParentDeregistration => "parent deregistration",
            DeregReason::UnhandledException => "unhandled exception",
        };
        write!(f, "{text}")
    }
}

/// Callback run after a cooperation registered.
pub type RegNotificator = Box<dyn Fn(&Environment, &str) + Send + Sync>;

/// Callback run after a cooperation finally deregistered.
pub type DeregNotificator = Box<dyn Fn(&Environment, &str, DeregReason) + Send + Sync>;

/// Builder for a cooperation.
///
/// Collect agents (each with an optional per-agent binder falling back to
/// the cooperation's default binder), then hand the finished value to
/// [`Environment::register_coop`](crate::env::Environment::register_coop).
///
/// # Example
/// ```rust,ignore
/// let mut coop = env.create_coop("pipeline");
/// coop.add_agent(Reader::new(input.clone()));
/// coop.add_agent_with_binder(Writer::new(output), ActiveObjBinder::new("io"));
/// env.register_coop(coop)?;
/// ```
pub struct Coop {
    pub(crate) name: String,
    pub(crate) default_binder: Arc<dyn DispBinder>,
    pub(crate) parent: Option<String>,
    pub(crate) agents: Vec<(Box<dyn Agent>, Option<Arc<dyn DispBinder>>)>,
    pub(crate) reg_notificators: Vec<RegNotificator>,
    pub(crate) dereg_notificators: Vec<DeregNotificator>,
    pub(crate) reaction: ExceptionReaction,
}

impl Coop {
    /// Create a cooperation bound to the environment's default dispatcher.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_binder(name, DefaultDispBinder::new())
    }

    /// Create a cooperation with an explicit default binder.
    pub fn with_binder(name: impl Into<String>, binder: Arc<dyn DispBinder>) -> Self {
        Self {
            name: name.into(),
            default_binder: binder,
            parent: None,
            agents: Vec::new(),
            reg_notificators: Vec::new(),
            dereg_notificators: Vec::new(),
            reaction: ExceptionReaction::Inherit,
        }
    }

    /// The cooperation's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the parent cooperation, if one was set.
    pub fn parent_coop_name(&self) -> Result<&str, RegistryError> {
        self.parent
            .as_deref()
            .ok_or_else(|| RegistryError::CoopHasNoParent(self.name.clone()))
    }

    /// Make this cooperation a child of `parent`.
    ///
    /// A child cannot be registered once its parent began deregistration,
    /// and the parent does not finally deregister before all children have.
    pub fn set_parent_coop_name(&mut self, parent: impl Into<String>) {
        self.parent = Some(parent.into());
    }

    /// Add an agent bound through the cooperation's default binder.
    pub fn add_agent(&mut self, agent: impl Agent) {
        self.agents.push((Box::new(agent), None));
    }

    /// Add an agent with its own binder.
    pub fn add_agent_with_binder(&mut self, agent: impl Agent, binder: Arc<dyn DispBinder>) {
        self.agents.push((Box::new(agent), Some(binder)));
    }

    /// Number of agents collected so far.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Run `notificator` after successful registration.
    pub fn add_reg_notificator<F>(&mut self, notificator: F)
    where
        F: Fn(&Environment, &str) + Send + Sync + 'static,
    {
        self.reg_notificators.push(Box::new(notificator));
    }

    /// Run `notificator` after final deregistration.
    pub fn add_dereg_notificator<F>(&mut self, notificator: F)
    where
        F: Fn(&Environment, &str, DeregReason) + Send + Sync + 'static,
    {
        self.dereg_notificators.push(Box::new(notificator));
    }

    /// Exception reaction for agents of this cooperation that inherit
    /// theirs.
    pub fn set_exception_reaction(&mut self, reaction: ExceptionReaction) {
        self.reaction = reaction;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use crate::agent::traits::AgentResult;
    use crate::agent::AgentContext;

    struct Worker;
    impl Agent for Worker {
        fn define(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
            Ok(())
        }
    }

    #[test]
    fn test_builder_collects_agents() {
        let mut coop = Coop::new("workers");
        coop.add_agent(Worker);
        coop.add_agent(Worker);

        assert_eq!(coop.name(), "workers");
        assert_eq!(coop.agent_count(), 2);
    }

    #[test]
    fn test_parent_accessor() {
        let mut coop = Coop::new("child");
        assert!(matches!(
            coop.parent_coop_name(),
            Err(RegistryError::CoopHasNoParent(_))
        ));

        coop.set_parent_coop_name("root");
        assert_eq!(coop.parent_coop_name().unwrap(), "root");
    }

    #[test]
    fn test_dereg_reason_display() {
        assert_eq!(DeregReason::Normal.to_string(), "normal");
        assert_eq!(DeregReason::Shutdown.to_string(), "shutdown");
        assert_eq!(
            DeregReason::ParentDeregistration.to_string(),
            "parent deregistration"
        );
        assert_eq!(
            DeregReason::UnhandledException.to_string(),
            "unhandled exception"
        );
    }
}

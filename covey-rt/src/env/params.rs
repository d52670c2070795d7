// Layer 1: Standard library imports
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use super::layer::Layer;
use super::listener::CoopListener;
use crate::agent::traits::ExceptionReaction;
use crate::dispatcher::Dispatcher;

/// Bootstrap parameters for an environment.
///
/// # Example
/// ```rust,ignore
/// let params = EnvParams::default()
///     .add_named_dispatcher("active_obj", ActiveObjDispatcher::new())
///     .with_default_exception_reaction(ExceptionReaction::DeregisterCoop)
///     .with_message_tracing(true);
/// launch_with_params(params, init)?;
/// ```
pub struct EnvParams {
    pub(crate) named_dispatchers: HashMap<String, Arc<dyn Dispatcher>>,
    pub(crate) layers: Vec<Arc<dyn Layer>>,
    pub(crate) coop_listener: Option<Box<dyn CoopListener>>,
    pub(crate) default_exception_reaction: ExceptionReaction,
    pub(crate) message_tracing: bool,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            named_dispatchers: HashMap::new(),
            layers: Vec::new(),
            coop_listener: None,
            default_exception_reaction: ExceptionReaction::Abort,
            message_tracing: false,
        }
    }
}

impl EnvParams {
    /// Register a dispatcher under `name` for binders to resolve.
    pub fn add_named_dispatcher(
        mut self,
        name: impl Into<String>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        self.named_dispatchers.insert(name.into(), dispatcher);
        self
    }

    /// Add a layer started with the environment.
    pub fn add_layer(mut self, layer: Arc<dyn Layer>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Install an observer of cooperation registrations.
    pub fn with_coop_listener(mut self, listener: Box<dyn CoopListener>) -> Self {
        self.coop_listener = Some(listener);
        self
    }

    /// Reaction applied when agent and cooperation both inherit theirs.
    ///
    /// `Inherit` is normalized to `Abort` at the end of the chain.
    pub fn with_default_exception_reaction(mut self, reaction: ExceptionReaction) -> Self {
        self.default_exception_reaction = reaction;
        self
    }

    /// Emit a trace record per mailbox delivery.
    pub fn with_message_tracing(mut self, enabled: bool) -> Self {
        self.message_tracing = enabled;
        self
    }
}

impl fmt::Debug for EnvParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvParams")
            .field(
                "named_dispatchers",
                &self.named_dispatchers.keys().collect::<Vec<_>>(),
            )
            .field("layers", &self.layers.len())
            .field("coop_listener", &self.coop_listener.is_some())
            .field(
                "default_exception_reaction",
                &self.default_exception_reaction,
            )
            .field("message_tracing", &self.message_tracing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ActiveObjDispatcher;

    #[test]
    fn test_defaults() {
        let params = EnvParams::default();

        assert!(params.named_dispatchers.is_empty());
        assert!(params.layers.is_empty());
        assert!(params.coop_listener.is_none());
        assert_eq!(
            params.default_exception_reaction,
            ExceptionReaction::Abort
        );
        assert!(!params.message_tracing);
    }

    #[test]
    fn test_builder_chaining() {
        let params = EnvParams::default()
            .add_named_dispatcher("active_obj", ActiveObjDispatcher::new())
            .with_default_exception_reaction(ExceptionReaction::Ignore)
            .with_message_tracing(true);

        assert_eq!(params.named_dispatchers.len(), 1);
        assert!(params.named_dispatchers.contains_key("active_obj"));
        assert_eq!(
            params.default_exception_reaction,
            ExceptionReaction::Ignore
        );
        assert!(params.message_tracing);
    }
}

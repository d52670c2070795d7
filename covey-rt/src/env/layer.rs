// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use super::environment::Environment;
use crate::agent::traits::AgentResult;

/// An application-defined extension with an environment-bound lifecycle.
///
/// Layers start before the init function runs and are shut down after the
/// registry drained, before the dispatchers stop. The runtime treats them
/// as opaque: it only drives the three lifecycle calls.
pub trait Layer: Send + Sync + 'static {
    /// Called once while the environment starts.
    fn start(&self, env: &Environment) -> AgentResult;

    /// Non-blocking request to stop.
    fn shutdown(&self) {}

    /// Block until the layer finished stopping.
    fn wait(&self) {}
}

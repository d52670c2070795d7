// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use super::environment::Environment;
use crate::coop::DeregReason;

/// Observer of cooperation lifecycle events.
///
/// Installed through [`EnvParams::with_coop_listener`](super::EnvParams::with_coop_listener);
/// `on_registered` runs on the registering thread right after the
/// registration committed, `on_deregistered` on the final-deregistration
/// worker.
pub trait CoopListener: Send + Sync {
    /// A cooperation finished registration.
    fn on_registered(&self, env: &Environment, coop_name: &str);

    /// A cooperation was finally deregistered.
    fn on_deregistered(&self, env: &Environment, coop_name: &str, reason: DeregReason);
}

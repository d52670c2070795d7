// Layer 1: Standard library imports
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::environment::Environment;
use super::params::EnvParams;
use crate::agent::traits::AgentResult;
use crate::dispatcher::error::DispatchError;
use crate::util::panics::describe_panic;

/// Errors surfaced by [`launch`] and [`launch_with_params`].
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The init function returned an error or panicked.
    #[error("environment initialization failed: {0}")]
    InitFailed(String),

    /// An agent fault with the shutdown reaction stopped the environment.
    #[error("environment stopped after an agent fault: {0}")]
    FaultShutdown(String),

    /// A layer failed to start.
    #[error("layer failed to start: {0}")]
    LayerFailed(String),

    /// A dispatcher or runtime worker could not be started.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Run an environment with default parameters.
///
/// `init` executes on a framework-managed thread with the started
/// environment; the caller blocks until the environment stops (normally
/// through [`Environment::stop`]), then the full shutdown sequence runs.
/// Errors and panics from `init` bubble out as
/// [`LaunchError::InitFailed`].
///
/// # Example
/// ```rust,ignore
/// covey_rt::launch(|env| {
///     let mut coop = env.create_coop("main");
///     coop.add_agent(Hello::default());
///     env.register_coop(coop)?;
///     Ok(())
/// })?;
/// ```
pub fn launch<F>(init: F) -> Result<(), LaunchError>
where
    F: FnOnce(&Environment) -> AgentResult + Send + 'static,
{
    launch_with_params(EnvParams::default(), init)
}

/// Run an environment with explicit parameters.
pub fn launch_with_params<F>(params: EnvParams, init: F) -> Result<(), LaunchError>
where
    F: FnOnce(&Environment) -> AgentResult + Send + 'static,
{
    let env = Environment::new(params);
    if let Err(err) = env.start_runtime() {
        env.stop();
        env.shutdown_runtime();
        return Err(err);
    }

    let init_env = env.clone();
    let init_thread = thread::Builder::new()
        .name("covey-init".to_string())
        .spawn(move || -> Option<String> {
            match catch_unwind(AssertUnwindSafe(|| init(&init_env))) {
                Ok(Ok(())) => None,
                Ok(Err(fault)) => {
                    init_env.stop();
                    Some(fault.to_string())
                }
                Err(payload) => {
                    init_env.stop();
                    Some(describe_panic(payload.as_ref()))
                }
            }
        });
    let init_thread = match init_thread {
        Ok(handle) => handle,
        Err(err) => {
            env.stop();
            env.shutdown_runtime();
            return Err(DispatchError::SpawnFailed(err.to_string()).into());
        }
    };

    env.wait_for_stop();
    env.shutdown_runtime();

    let init_failure = init_thread
        .join()
        .unwrap_or_else(|payload| Some(describe_panic(payload.as_ref())));
    if let Some(reason) = init_failure {
        return Err(LaunchError::InitFailed(reason));
    }
    if let Some(fault) = env.take_agent_fault() {
        return Err(LaunchError::FaultShutdown(fault));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)] // Tests are allowed to use panic for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_launch_stops_on_init_error() {
        let result = launch(|_env| Err("bootstrap refused".into()));

        match result {
            Err(LaunchError::InitFailed(reason)) => assert!(reason.contains("bootstrap refused")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_launch_surfaces_init_panic() {
        let result = launch(|_env| panic!("boom at init"));

        match result {
            Err(LaunchError::InitFailed(reason)) => assert!(reason.contains("boom at init")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_launch_returns_after_stop() {
        let result = launch(|env| {
            env.stop();
            Ok(())
        });
        assert!(result.is_ok());
    }
}

// Layer 1: Standard library imports
use std::any::Any;
use std::error::Error;

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
use super::context::AgentContext;

/// Type-erased failure raised by agent hooks and event handlers.
pub type AgentFault = Box<dyn Error + Send + Sync + 'static>;

/// Result type used by agent hooks and event handlers.
pub type AgentResult<T = ()> = Result<T, AgentFault>;

/// The user-implemented side of an agent.
///
/// An agent joins the runtime as part of a cooperation. The runtime drives
/// it through a fixed lifecycle:
///
/// 1. [`define`](Agent::define) runs once, on the registering thread,
///    before any event. Make subscriptions here.
/// 2. [`on_start`](Agent::on_start) is the first thing executed on the
///    agent's bound worker.
/// 3. Event handlers registered in `define` run one at a time on that same
///    worker.
/// 4. [`on_finish`](Agent::on_finish) runs last, after the agent's queue
///    has drained during cooperation deregistration.
///
/// A failure (an `Err` return or a panic) in `on_start`, `on_finish` or an
/// event handler is routed through the agent's
/// [exception reaction](ExceptionReaction).
///
/// # Example
/// ```rust,ignore
/// struct Greeter {
///     listeners: MboxRef,
/// }
///
/// impl Agent for Greeter {
///     fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
///         ctx.subscribe(&self.listeners).event(Self::on_hello)?;
///         Ok(())
///     }
/// }
///
/// impl Greeter {
///     fn on_hello(&mut self, _ctx: &mut AgentContext<'_>, msg: &Hello) -> AgentResult {
///         println!("hello, {}", msg.name);
///         Ok(())
///     }
/// }
/// ```
pub trait Agent: Any + Send {
    /// Called once during cooperation registration, before the agent is
    /// bound to a worker. Intended for subscriptions.
    fn define(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        Ok(())
    }

    /// First invocation on the agent's bound worker, guaranteed to precede
    /// every event handler call.
    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        Ok(())
    }

    /// Last invocation on the agent's bound worker, after the event queue
    /// has drained during deregistration.
    fn on_finish(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        Ok(())
    }

    /// How failures from this agent's hooks and handlers are handled.
    ///
    /// [`ExceptionReaction::Inherit`] defers to the cooperation and then to
    /// the environment default. An explicit override installed through
    /// [`AgentContext::set_exception_reaction`] takes precedence over this
    /// method.
    fn exception_reaction(&self) -> ExceptionReaction {
        ExceptionReaction::Inherit
    }
}

/// Reaction to a failure escaping an agent hook or event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExceptionReaction {
    /// Terminate the process with a fatal log record.
    Abort,
    /// Initiate an orderly shutdown of the whole environment.
    ShutdownEnvironment,
    /// Begin deregistration of the failing agent's cooperation.
    DeregisterCoop,
    /// Log and continue with the next event.
    Ignore,
    /// Defer to the cooperation, then to the environment default.
    #[default]
    Inherit,
}

//! # covey-rt - Agent-Model Runtime
//!
//! A library for expressing concurrent systems as cooperating *agents*
//! exchanging typed messages through *mailboxes*, scheduled onto
//! configurable *dispatchers*. Agents are grouped into *cooperations*, the
//! unit of registration, parent/child lifecycle and deregistration.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use covey_rt::prelude::*;
//!
//! #[derive(Debug)]
//! struct Hello {
//!     text: String,
//! }
//! impl Message for Hello {}
//!
//! struct Greeter {
//!     inbox: MboxRef,
//! }
//!
//! impl Agent for Greeter {
//!     fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
//!         ctx.subscribe(&self.inbox).event(Self::on_hello)?;
//!         Ok(())
//!     }
//!
//!     fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
//!         self.inbox.deliver(Hello { text: "hi".into() });
//!         Ok(())
//!     }
//! }
//!
//! impl Greeter {
//!     fn on_hello(&mut self, ctx: &mut AgentContext<'_>, msg: &Hello) -> AgentResult {
//!         println!("{}", msg.text);
//!         ctx.env().stop();
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), covey_rt::LaunchError> {
//!     covey_rt::launch(|env| {
//!         let inbox = env.create_mbox();
//!         let mut coop = env.create_coop("main");
//!         coop.add_agent(Greeter { inbox });
//!         env.register_coop(coop)?;
//!         Ok(())
//!     })
//! }
//! ```
//!
//! # Execution Model
//!
//! True parallel OS threads, no cooperative suspension. Each dispatcher
//! owns one or more worker threads; an agent is bound to exactly one
//! dispatcher for its lifetime and all of its hooks and handlers run on
//! that dispatcher's workers, never concurrently for the same agent.
//! Blocking a handler blocks its worker; the only built-in blocking point
//! is the synchronous service request.
//!
//! Delivery is intra-process, best-effort, with strong ordering inside a
//! mailbox (per sending thread) and per-agent serialization across all of
//! an agent's mailboxes.
//!
//! # Module Organization
//!
//! ## Core
//! - [`message`] - Message/signal traits, type tags and envelopes
//! - [`mailbox`] - Publish/subscribe endpoints with per-type subscriber
//!   lists
//! - [`agent`] - Agent trait, context, states and the event machinery
//! - [`svc`] - Synchronous request/reply over mailboxes
//!
//! ## Infrastructure
//! - [`dispatcher`] - Worker threads and binding policies (one-thread,
//!   active-object, active-group)
//! - [`coop`] - Cooperation builder and lifecycle
//! - [`registry`] - Name tables and two-phase deregistration
//! - [`env`] - Environment bootstrap, parameters and shutdown
//! - [`util`] - Identifiers and small helpers

pub mod agent;
pub mod coop;
pub mod dispatcher;
pub mod env;
pub mod mailbox;
pub mod message;
pub mod prelude;
pub mod registry;
pub mod svc;
pub mod util;

// Re-export commonly used types
pub use agent::{
    Agent, AgentCell, AgentContext, AgentFault, AgentRef, AgentResult, ExceptionReaction, State,
    StateNotOwned,
};
pub use coop::{Coop, DeregReason};
pub use dispatcher::{
    ActiveGroupBinder, ActiveGroupDispatcher, ActiveObjBinder, ActiveObjDispatcher,
    DefaultDispBinder, DispBinder, DispatchError, Dispatcher, OneThreadBinder, OneThreadDispatcher,
};
pub use env::{launch, launch_with_params, CoopListener, EnvParams, Environment, Layer, LaunchError};
pub use mailbox::{Mbox, MboxError, MboxRef};
pub use message::{Message, Signal, TypeTag};
pub use registry::{RegistryError, RegistryStats};
pub use svc::{RequestHandle, SvcError};
pub use util::{AgentId, MboxId};

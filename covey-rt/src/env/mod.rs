//! The environment: top-level container owning mailboxes, dispatchers and
//! the cooperation registry.
//!
//! # Components
//!
//! - [`Environment`] - Handle passed to every component that needs the
//!   runtime; explicit init/teardown lifecycle, no hidden singletons
//! - [`EnvParams`] - Bootstrap configuration (named dispatchers, layers,
//!   cooperation listener, default exception reaction, message tracing)
//! - [`launch`] / [`launch_with_params`] - Bootstrap entry points
//! - [`Layer`] - Opaque user plug-in lifecycle hook
//! - [`CoopListener`] - Observer of cooperation registration events

pub mod environment;
pub mod launch;
pub mod layer;
pub mod listener;
pub mod params;

pub use environment::Environment;
pub use launch::{launch, launch_with_params, LaunchError};
pub use layer::Layer;
pub use listener::CoopListener;
pub use params::EnvParams;

// Layer 1: Standard library imports
use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

// Layer 2: Third-party crate imports
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

// Layer 3: Internal module imports
use super::error::RegistryError;
use super::final_dereg::FinalDeregChannel;
use crate::agent::cell::AgentCell;
use crate::coop::builder::{Coop, DeregReason};
use crate::coop::runtime::{AgentEntry, CoopRuntime};
use crate::dispatcher::error::DispatchError;
use crate::env::environment::Environment;
use crate::env::listener::CoopListener;
use crate::util::panics::{describe_panic, AbortOnPanic};

/// Counters describing the registry's current population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Cooperations currently registered.
    pub registered_coops: usize,
    /// Cooperations in the deregistration phase.
    pub deregistered_coops: usize,
    /// Agents across both sets.
    pub total_agents: usize,
}

struct RegistryMaps {
    registered: HashMap<String, Arc<CoopRuntime>>,
    deregistered: HashMap<String, Arc<CoopRuntime>>,
    parent_child: BTreeSet<(String, String)>,
    dereg_started: bool,
    total_agents: usize,
}

/// Named cooperation map with parent/child tracking and the
/// final-deregistration worker.
pub(crate) struct CoopRegistry {
    maps: Mutex<RegistryMaps>,
    drained: Condvar,
    final_chan: FinalDeregChannel,
    final_thread: Mutex<Option<JoinHandle<()>>>,
    listener: Option<Box<dyn CoopListener>>,
}

impl CoopRegistry {
    pub(crate) fn new(listener: Option<Box<dyn CoopListener>>) -> Self {
        Self {
            maps: Mutex::new(RegistryMaps {
                registered: HashMap::new(),
                deregistered: HashMap::new(),
                parent_child: BTreeSet::new(),
                dereg_started: false,
                total_agents: 0,
            }),
            drained: Condvar::new(),
            final_chan: FinalDeregChannel::new(),
            final_thread: Mutex::new(None),
            listener,
        }
    }

    /// Spawn the final-deregistration worker.
    pub(crate) fn start(&self, env: &Environment) -> Result<(), DispatchError> {
        let chan = self.final_chan.clone();
        let env = env.clone();
        let handle = thread::Builder::new()
            .name("covey-final-dereg".to_string())
            .spawn(move || {
                while let Some(coop) = chan.pop_blocking() {
                    finalize_coop(&env, &coop);
                }
            })
            .map_err(|err| DispatchError::SpawnFailed(err.to_string()))?;
        *self.final_thread.lock() = Some(handle);
        Ok(())
    }

    /// Register a cooperation.
    ///
    /// Runs under the registry lock: name validation, parent resolution,
    /// map insertion, then `define` and `bind` for each agent in order. Any
    /// failure unwinds every earlier bind and definition, removes the maps
    /// entries and surfaces as
    /// [`RegistryError::RegistrationFailed`]; nothing of the failed
    /// registration stays observable.
    ///
    /// Must not be called from an agent's `define` hook: the registry lock
    /// is already held there.
    pub(crate) fn register(&self, env: &Environment, coop: Coop) -> Result<(), RegistryError> {
        let Coop {
            name,
            default_binder,
            parent,
            agents,
            reg_notificators,
            dereg_notificators,
            reaction,
        } = coop;

        let entries: Vec<AgentEntry> = agents
            .into_iter()
            .map(|(behavior, binder)| AgentEntry {
                cell: AgentCell::new(behavior, env),
                binder: binder.unwrap_or_else(|| Arc::clone(&default_binder)),
            })
            .collect();
        let runtime = CoopRuntime::new(
            name.clone(),
            parent.clone(),
            entries,
            reaction,
            reg_notificators,
            dereg_notificators,
        );
        for entry in runtime.agents() {
            entry.cell.attach_to_coop(&runtime);
        }

        {
            let mut maps = self.maps.lock();
            if maps.dereg_started {
                return Err(RegistryError::ShuttingDown);
            }
            if maps.registered.contains_key(&name) || maps.deregistered.contains_key(&name) {
                return Err(RegistryError::DuplicateCoopName(name));
            }
            let parent_runtime = match &parent {
                Some(parent_name) => {
                    if let Some(rt) = maps.registered.get(parent_name) {
                        Some(Arc::clone(rt))
                    } else if maps.deregistered.contains_key(parent_name) {
                        return Err(RegistryError::ParentStoppedAcceptingChildren(
                            parent_name.clone(),
                        ));
                    } else {
                        return Err(RegistryError::ParentCoopNotFound(parent_name.clone()));
                    }
                }
                None => None,
            };

            maps.registered.insert(name.clone(), Arc::clone(&runtime));
            if let Some(parent_name) = &parent {
                maps.parent_child
                    .insert((parent_name.clone(), name.clone()));
            }
            if let Some(parent_rt) = &parent_runtime {
                // The parent cannot finally deregister before this child.
                parent_rt.increment_usage();
            }
            maps.total_agents += runtime.agent_count();

            let mut touched = 0;
            let mut bound = 0;
            let mut failure: Option<String> = None;
            for entry in runtime.agents() {
                touched += 1;
                if let Err(reason) = entry.cell.run_define(env) {
                    failure = Some(reason);
                    break;
                }
                match catch_unwind(AssertUnwindSafe(|| entry.binder.bind(env, &entry.cell))) {
                    Ok(Ok(())) => bound += 1,
                    Ok(Err(err)) => {
                        failure = Some(err.to_string());
                        break;
                    }
                    Err(payload) => {
                        failure = Some(format!(
                            "binder panicked: {}",
                            describe_panic(payload.as_ref())
                        ));
                        break;
                    }
                }
            }
            if let Some(reason) = failure {
                for entry in runtime.agents().iter().take(bound).rev() {
                    unbind_or_abort(env, entry);
                }
                for entry in runtime.agents().iter().take(touched) {
                    entry.cell.teardown_subscriptions();
                }
                maps.registered.remove(&name);
                if let Some(parent_name) = &parent {
                    maps.parent_child
                        .remove(&(parent_name.clone(), name.clone()));
                }
                if let Some(parent_rt) = &parent_runtime {
                    parent_rt.decrement_usage(env);
                }
                maps.total_agents -= runtime.agent_count();
                return Err(RegistryError::RegistrationFailed { coop: name, reason });
            }

            runtime.start_agents();
            debug!(coop = %name, agents = runtime.agent_count(), "cooperation registered");
        }

        if let Some(listener) = &self.listener {
            listener.on_registered(env, &name);
        }
        for notificator in runtime.reg_notificators() {
            notificator(env, &name);
        }
        Ok(())
    }

    /// Phase A of deregistration: move the cooperation and all transitive
    /// children from `registered` to `deregistered` and mark their agents.
    ///
    /// Synchronous, registry-locked, in the caller's thread. Already
    /// deregistering cooperations are left untouched.
    pub(crate) fn deregister(
        &self,
        env: &Environment,
        name: &str,
        reason: DeregReason,
    ) -> Result<(), RegistryError> {
        let mut maps = self.maps.lock();
        if maps.deregistered.contains_key(name) {
            return Ok(());
        }
        if !maps.registered.contains_key(name) {
            return Err(RegistryError::CoopNotRegistered(name.to_string()));
        }

        let guard = AbortOnPanic::new("cooperation deregistration");
        let mut order: Vec<String> = vec![name.to_string()];
        let mut next = 0;
        while next < order.len() {
            let parent = order[next].clone();
            let children: Vec<String> = maps
                .parent_child
                .range((parent.clone(), String::new())..)
                .take_while(|(p, _)| *p == parent)
                .map(|(_, child)| child.clone())
                .collect();
            for child in children {
                // A child absent from `registered` is already mid-phase-B.
                if maps.registered.contains_key(&child) {
                    order.push(child);
                }
            }
            next += 1;
        }
        for (index, coop_name) in order.iter().enumerate() {
            if let Some(runtime) = maps.registered.remove(coop_name) {
                maps.deregistered
                    .insert(coop_name.clone(), Arc::clone(&runtime));
                let coop_reason = if index == 0 {
                    reason
                } else {
                    DeregReason::ParentDeregistration
                };
                runtime.start_deregistration(env, coop_reason);
            }
        }
        guard.disarm();
        Ok(())
    }

    /// Shutdown step: deregister every remaining cooperation with reason
    /// `shutdown` and refuse further registrations.
    pub(crate) fn deregister_all(&self, env: &Environment) {
        let mut maps = self.maps.lock();
        let guard = AbortOnPanic::new("deregistration of all cooperations");
        maps.dereg_started = true;
        let names: Vec<String> = maps.registered.keys().cloned().collect();
        for name in names {
            if let Some(runtime) = maps.registered.remove(&name) {
                maps.deregistered.insert(name, Arc::clone(&runtime));
                runtime.start_deregistration(env, DeregReason::Shutdown);
            }
        }
        guard.disarm();
    }

    /// Make `register` fail with `ShuttingDown` from now on.
    pub(crate) fn refuse_new_registrations(&self) {
        self.maps.lock().dereg_started = true;
    }

    /// Queue a cooperation whose usage count reached zero for the
    /// final-deregistration worker.
    pub(crate) fn ready_to_final_dereg(&self, coop: Arc<CoopRuntime>) {
        self.final_chan.push(coop);
    }

    /// Terminal step, run on the final-deregistration worker after every
    /// agent was unbound.
    fn final_remove(&self, env: &Environment, coop: &Arc<CoopRuntime>) {
        let parent_runtime = {
            let mut maps = self.maps.lock();
            let guard = AbortOnPanic::new("final cooperation removal");
            maps.deregistered.remove(coop.name());
            maps.total_agents -= coop.agent_count();
            let parent_runtime = match coop.parent_name() {
                Some(parent_name) => {
                    maps.parent_child
                        .remove(&(parent_name.to_string(), coop.name().to_string()));
                    maps.registered
                        .get(parent_name)
                        .or_else(|| maps.deregistered.get(parent_name))
                        .cloned()
                }
                None => None,
            };
            if maps.registered.is_empty() && maps.deregistered.is_empty() {
                self.drained.notify_all();
            }
            guard.disarm();
            parent_runtime
        };
        // Only now may the parent finalize; its usage still carried one
        // unit for this child.
        if let Some(parent) = parent_runtime {
            parent.decrement_usage(env);
        }
        if let Some(listener) = &self.listener {
            listener.on_deregistered(env, coop.name(), coop.dereg_reason());
        }
        for notificator in coop.dereg_notificators() {
            notificator(env, coop.name(), coop.dereg_reason());
        }
        debug!(coop = %coop.name(), reason = %coop.dereg_reason(), "cooperation finally deregistered");
    }

    /// Block until both name tables are empty.
    pub(crate) fn wait_until_drained(&self) {
        let mut maps = self.maps.lock();
        while !(maps.registered.is_empty() && maps.deregistered.is_empty()) {
            self.drained.wait(&mut maps);
        }
    }

    /// Shutdown sequence of the registry: deregister everything, wait for
    /// the tables to drain, then close the final-dereg channel and join
    /// its worker.
    pub(crate) fn finish(&self, env: &Environment) {
        self.deregister_all(env);
        self.wait_until_drained();
        self.final_chan.close();
        let handle = self.final_thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("final-deregistration worker terminated by panic");
            }
        }
    }

    pub(crate) fn stats(&self) -> RegistryStats {
        let maps = self.maps.lock();
        RegistryStats {
            registered_coops: maps.registered.len(),
            deregistered_coops: maps.deregistered.len(),
            total_agents: maps.total_agents,
        }
    }
}

/// Unbind every agent and remove the cooperation from the registry.
fn finalize_coop(env: &Environment, coop: &Arc<CoopRuntime>) {
    for entry in coop.agents() {
        unbind_or_abort(env, entry);
    }
    env.registry().final_remove(env, coop);
}

/// Binder `unbind` must not fail; a panic here leaves dispatcher state
/// inconsistent and is treated as fatal.
fn unbind_or_abort(env: &Environment, entry: &AgentEntry) {
    let outcome = catch_unwind(AssertUnwindSafe(|| entry.binder.unbind(env, &entry.cell)));
    if let Err(payload) = outcome {
        error!(
            agent = %entry.cell.id(),
            panic = %describe_panic(payload.as_ref()),
            "binder unbind panicked"
        );
        std::process::abort();
    }
}

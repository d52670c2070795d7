//! State machine behavior: committed transitions notify listeners,
//! state-scoped subscriptions filter deliveries, and unsubscribing
//! restores the prior behavior.

#![allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity

use std::sync::{Arc, Mutex};

use covey_rt::prelude::*;

type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
struct Probe;
impl Message for Probe {}

struct Step;
impl Signal for Step {}

struct Moody {
    log: EventLog,
    me: Option<MboxRef>,
    st_other: Option<State>,
    steps: usize,
}

impl Moody {
    fn push(&self, event: impl Into<String>) {
        self.log.lock().unwrap().push(event.into());
    }
}

impl Agent for Moody {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        let me = ctx.direct_mbox();
        let st_other = ctx.state("other");

        let transitions = Arc::clone(&self.log);
        ctx.add_state_listener(move |state| {
            transitions.lock().unwrap().push(format!("-> {}", state.name()));
        });

        ctx.subscribe(&me)
            .in_state(&st_other)
            .event(Self::on_probe_other)?;
        ctx.subscribe(&me).signal::<Step, _, _, _>(Self::on_step)?;

        self.me = Some(me);
        self.st_other = Some(st_other);
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        if let Some(me) = &self.me {
            // Default state: no handler matches, the delivery is dropped.
            me.deliver(Probe);
            me.deliver_signal::<Step>();
        }
        Ok(())
    }
}

impl Moody {
    fn on_probe_other(&mut self, _ctx: &mut AgentContext<'_>, _msg: &Probe) -> AgentResult {
        self.push("probe@other");
        Ok(())
    }

    fn on_step(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        self.steps += 1;
        let me = self.me.clone();
        match self.steps {
            1 => {
                if let Some(st) = self.st_other.clone() {
                    ctx.change_state(&st)?;
                }
                if let Some(me) = &me {
                    me.deliver(Probe);
                    me.deliver_signal::<Step>();
                }
            }
            2 => {
                // Round trip: switching back restores the previous state
                // and the listener observes both transitions.
                let default = ctx.default_state();
                ctx.change_state(&default)?;
                if let Some(me) = &me {
                    me.deliver(Probe);
                    me.deliver_signal::<Step>();
                }
            }
            _ => ctx.env().stop(),
        }
        Ok(())
    }
}

#[test]
fn transitions_notify_listeners_and_filter_events() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::clone(&log);

    let result = launch(move |env| {
        let mut coop = env.create_coop("moody");
        coop.add_agent(Moody {
            log: events,
            me: None,
            st_other: None,
            steps: 0,
        });
        env.register_coop(coop)?;
        Ok(())
    });

    assert!(result.is_ok(), "launch failed: {result:?}");
    // The probes in the default state left no trace; only the probe sent
    // while in "other" was handled.
    assert_eq!(
        *log.lock().unwrap(),
        vec!["-> other", "probe@other", "-> <default>"]
    );
}

struct ForeignState {
    victim_state: Arc<Mutex<Option<State>>>,
}

impl Agent for ForeignState {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        // Publish one of this agent's states for the other agent to try.
        *self.victim_state.lock().unwrap() = Some(ctx.state("mine"));
        Ok(())
    }
}

struct Intruder {
    outcome: Arc<Mutex<Option<String>>>,
    victim_state: Arc<Mutex<Option<State>>>,
}

impl Agent for Intruder {
    fn on_start(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        if let Some(foreign) = self.victim_state.lock().unwrap().clone() {
            let report = match ctx.change_state(&foreign) {
                Err(err) => format!("rejected: {err}"),
                Ok(()) => "accepted".to_string(),
            };
            *self.outcome.lock().unwrap() = Some(report);
        }
        ctx.env().stop();
        Ok(())
    }
}

#[test]
fn changing_to_a_foreign_state_is_rejected() {
    let outcome = Arc::new(Mutex::new(None));
    let victim_state = Arc::new(Mutex::new(None));
    let report = Arc::clone(&outcome);
    let shared_state = Arc::clone(&victim_state);

    let result = launch(move |env| {
        let mut coop = env.create_coop("states");
        coop.add_agent(ForeignState {
            victim_state: Arc::clone(&shared_state),
        });
        coop.add_agent(Intruder {
            outcome: report,
            victim_state: shared_state,
        });
        env.register_coop(coop)?;
        Ok(())
    });

    assert!(result.is_ok(), "launch failed: {result:?}");
    let report = outcome.lock().unwrap().clone();
    assert!(
        report.as_deref().is_some_and(|r| r.starts_with("rejected")),
        "report was: {report:?}"
    );
}

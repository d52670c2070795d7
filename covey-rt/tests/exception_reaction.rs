//! Exception-reaction policies: shutdown, ignore and
//! deregister-cooperation.

#![allow(clippy::unwrap_used, clippy::panic)] // Tests are allowed to use unwrap and panic for simplicity

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use covey_rt::prelude::*;

struct FaultyStart;

impl Agent for FaultyStart {
    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        Err("boom on start".into())
    }

    fn exception_reaction(&self) -> ExceptionReaction {
        ExceptionReaction::ShutdownEnvironment
    }
}

#[test]
fn shutdown_reaction_stops_environment_and_surfaces_fault() {
    let result = launch(|env| {
        let mut coop = env.create_coop("faulty");
        coop.add_agent(FaultyStart);
        env.register_coop(coop)?;
        Ok(())
    });

    match result {
        Err(LaunchError::FaultShutdown(fault)) => {
            assert!(fault.contains("boom on start"), "fault was: {fault}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[derive(Debug)]
struct Nudge {
    fail: bool,
}
impl Message for Nudge {}

struct Wobbly {
    hits: Arc<AtomicUsize>,
    me: Option<MboxRef>,
}

impl Agent for Wobbly {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        let me = ctx.direct_mbox();
        ctx.subscribe(&me).event(Self::on_nudge)?;
        self.me = Some(me);
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        if let Some(me) = &self.me {
            me.deliver(Nudge { fail: true });
            me.deliver(Nudge { fail: false });
        }
        Ok(())
    }
}

impl Wobbly {
    fn on_nudge(&mut self, ctx: &mut AgentContext<'_>, msg: &Nudge) -> AgentResult {
        if msg.fail {
            return Err("transient failure".into());
        }
        self.hits.fetch_add(1, Ordering::SeqCst);
        ctx.env().stop();
        Ok(())
    }
}

#[test]
fn ignore_reaction_continues_with_next_event() {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);

    let params =
        EnvParams::default().with_default_exception_reaction(ExceptionReaction::Ignore);
    let result = launch_with_params(params, move |env| {
        let mut coop = env.create_coop("wobbly");
        coop.add_agent(Wobbly {
            hits: seen,
            me: None,
        });
        env.register_coop(coop)?;
        Ok(())
    });

    assert!(result.is_ok(), "launch failed: {result:?}");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

struct SelfDestruct {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Agent for SelfDestruct {
    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        self.log.lock().unwrap().push("started");
        Err("cannot continue".into())
    }

    fn on_finish(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        self.log.lock().unwrap().push("finished");
        Ok(())
    }

    fn exception_reaction(&self) -> ExceptionReaction {
        ExceptionReaction::DeregisterCoop
    }
}

#[test]
fn deregister_reaction_takes_the_cooperation_down() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::clone(&log);

    let result = launch(move |env| {
        let mut coop = env.create_coop("doomed");
        coop.add_agent(SelfDestruct {
            log: Arc::clone(&events),
        });
        coop.add_dereg_notificator(|env, _name, reason| {
            assert_eq!(reason, DeregReason::UnhandledException);
            env.stop();
        });
        env.register_coop(coop)?;
        Ok(())
    });

    assert!(result.is_ok(), "launch failed: {result:?}");
    assert_eq!(*log.lock().unwrap(), vec!["started", "finished"]);
}

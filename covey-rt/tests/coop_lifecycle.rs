//! Parent/child cooperation lifecycle: a synchronous request that cannot
//! be served while its caller blocks the shared worker times out cleanly,
//! deregistration cascades to children, and a self-delivered signal still
//! arrives before `on_finish`.

#![allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity

use std::sync::{Arc, Mutex};
use std::time::Duration;

use covey_rt::prelude::*;

type EventLog = Arc<Mutex<Vec<String>>>;

struct DeregCmd;
impl Signal for DeregCmd {}

struct Note;
impl Signal for Note {}

struct Parent {
    inbox: MboxRef,
}

impl Agent for Parent {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        ctx.subscribe(&self.inbox)
            .signal::<DeregCmd, _, _, _>(Self::on_dereg)?;
        Ok(())
    }
}

impl Parent {
    fn on_dereg(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        ctx.env().deregister_coop("parent", DeregReason::Normal)?;
        Ok(())
    }
}

struct Child {
    parent_inbox: MboxRef,
    log: EventLog,
    me: Option<MboxRef>,
}

impl Agent for Child {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        let me = ctx.direct_mbox();
        ctx.subscribe(&me).signal::<Note, _, _, _>(Self::on_note)?;
        self.me = Some(me);
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        // Parent and child share the default worker: the parent cannot run
        // its handler while this hook blocks, so the wait must expire.
        let outcome = self
            .parent_inbox
            .request_signal::<(), DeregCmd>()
            .wait_for(Duration::from_millis(100));
        match outcome {
            Err(SvcError::ResultNotReceivedYet) => self.push("timeout"),
            other => self.push(&format!("unexpected outcome: {other:?}")),
        }
        if let Some(me) = &self.me {
            me.deliver_signal::<Note>();
        }
        Ok(())
    }

    fn on_finish(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        self.push("finish");
        Ok(())
    }
}

impl Child {
    fn push(&self, event: &str) {
        self.log.lock().unwrap().push(event.to_string());
    }

    fn on_note(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        self.push("note");
        Ok(())
    }
}

#[test]
fn dereg_request_times_out_and_signal_precedes_finish() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::clone(&log);

    let result = launch(move |env| {
        let parent_inbox = env.create_mbox();

        let mut parent = env.create_coop("parent");
        parent.add_agent(Parent {
            inbox: parent_inbox.clone(),
        });
        let drained = Arc::clone(&events);
        parent.add_dereg_notificator(move |env, _name, reason| {
            assert_eq!(reason, DeregReason::Normal);
            let stats = env.registry_stats();
            if stats.registered_coops == 0 && stats.deregistered_coops == 0 {
                drained.lock().unwrap().push("drained".to_string());
            }
            env.stop();
        });
        env.register_coop(parent)?;

        let mut child = env.create_coop("child");
        child.set_parent_coop_name("parent");
        child.add_agent(Child {
            parent_inbox,
            log: Arc::clone(&events),
            me: None,
        });
        env.register_coop(child)?;
        Ok(())
    });

    assert!(result.is_ok(), "launch failed: {result:?}");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["timeout", "note", "finish", "drained"]
    );
}

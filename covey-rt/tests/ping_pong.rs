//! Two agents on their direct mailboxes exchange a signal a fixed number
//! of times, then stop the environment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use covey_rt::prelude::*;

const EXCHANGES: usize = 1000;

#[derive(Debug)]
struct PartnerReady {
    partner: MboxRef,
}
impl Message for PartnerReady {}

#[derive(Debug)]
struct Ping {
    reply_to: MboxRef,
}
impl Message for Ping {}

struct Pong;
impl Signal for Pong {}

struct Pinger {
    handshake: MboxRef,
    deliveries: Arc<AtomicUsize>,
    me: Option<MboxRef>,
    partner: Option<MboxRef>,
    left: usize,
}

impl Agent for Pinger {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        let me = ctx.direct_mbox();
        ctx.subscribe(&me).signal::<Pong, _, _, _>(Self::on_pong)?;
        ctx.subscribe(&self.handshake).event(Self::on_partner)?;
        self.me = Some(me);
        Ok(())
    }
}

impl Pinger {
    fn send_ping(&self) {
        if let (Some(partner), Some(me)) = (&self.partner, &self.me) {
            partner.deliver(Ping {
                reply_to: me.clone(),
            });
        }
    }

    fn on_partner(&mut self, _ctx: &mut AgentContext<'_>, msg: &PartnerReady) -> AgentResult {
        self.partner = Some(msg.partner.clone());
        self.send_ping();
        Ok(())
    }

    fn on_pong(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        self.left -= 1;
        if self.left == 0 {
            ctx.env().stop();
        } else {
            self.send_ping();
        }
        Ok(())
    }
}

struct Ponger {
    handshake: MboxRef,
    deliveries: Arc<AtomicUsize>,
    me: Option<MboxRef>,
}

impl Agent for Ponger {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        let me = ctx.direct_mbox();
        ctx.subscribe(&me).event(Self::on_ping)?;
        self.me = Some(me);
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        if let Some(me) = &self.me {
            self.handshake.deliver(PartnerReady {
                partner: me.clone(),
            });
        }
        Ok(())
    }
}

impl Ponger {
    fn on_ping(&mut self, _ctx: &mut AgentContext<'_>, msg: &Ping) -> AgentResult {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        msg.reply_to.deliver_signal::<Pong>();
        Ok(())
    }
}

#[test]
fn ping_pong_exchanges_all_messages() {
    let deliveries = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&deliveries);

    let result = launch(move |env| {
        let handshake = env.create_mbox();
        let mut coop = env.create_coop("ping_pong");
        coop.add_agent(Pinger {
            handshake: handshake.clone(),
            deliveries: Arc::clone(&counter),
            me: None,
            partner: None,
            left: EXCHANGES,
        });
        coop.add_agent(Ponger {
            handshake,
            deliveries: counter,
            me: None,
        });
        env.register_coop(coop)?;
        Ok(())
    });

    assert!(result.is_ok(), "launch failed: {result:?}");
    assert_eq!(deliveries.load(Ordering::SeqCst), 2 * EXCHANGES);
}

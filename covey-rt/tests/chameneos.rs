//! Chameneos rendezvous on an active-object dispatcher: four creatures
//! meet pairwise at a meeting place, trade colors by the complement rule
//! and report their meeting counts once the limit is reached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use covey_rt::prelude::*;

const MEETINGS: usize = 10;
const CREATURES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Blue,
    Red,
    Yellow,
}

fn complement(own: Color, other: Color) -> Color {
    use Color::{Blue, Red, Yellow};
    match (own, other) {
        (Blue, Red) | (Red, Blue) => Yellow,
        (Blue, Yellow) | (Yellow, Blue) => Red,
        (Red, Yellow) | (Yellow, Red) => Blue,
        (same, _) => same,
    }
}

#[derive(Debug)]
struct MeetingRequest {
    who: MboxRef,
    color: Color,
}
impl Message for MeetingRequest {}

#[derive(Debug)]
struct MeetingResult {
    other: Color,
}
impl Message for MeetingResult {}

struct GameOver;
impl Signal for GameOver {}

#[derive(Debug)]
struct CountReport {
    meetings: usize,
}
impl Message for CountReport {}

struct MeetingPlace {
    inbox: MboxRef,
    waiting: Option<(MboxRef, Color)>,
    left: usize,
    reports: usize,
    total: Arc<AtomicUsize>,
}

impl Agent for MeetingPlace {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        ctx.subscribe(&self.inbox).event(Self::on_request)?;
        ctx.subscribe(&self.inbox).event(Self::on_report)?;
        Ok(())
    }
}

impl MeetingPlace {
    fn on_request(&mut self, _ctx: &mut AgentContext<'_>, msg: &MeetingRequest) -> AgentResult {
        if self.left == 0 {
            msg.who.deliver_signal::<GameOver>();
            if let Some((waiting, _)) = self.waiting.take() {
                waiting.deliver_signal::<GameOver>();
            }
            return Ok(());
        }
        match self.waiting.take() {
            None => self.waiting = Some((msg.who.clone(), msg.color)),
            Some((first, first_color)) => {
                self.left -= 1;
                first.deliver(MeetingResult { other: msg.color });
                msg.who.deliver(MeetingResult { other: first_color });
            }
        }
        Ok(())
    }

    fn on_report(&mut self, ctx: &mut AgentContext<'_>, msg: &CountReport) -> AgentResult {
        self.total.fetch_add(msg.meetings, Ordering::SeqCst);
        self.reports += 1;
        if self.reports == CREATURES {
            ctx.env().stop();
        }
        Ok(())
    }
}

struct Creature {
    place: MboxRef,
    color: Color,
    me: Option<MboxRef>,
    meetings: usize,
}

impl Agent for Creature {
    fn define(&mut self, ctx: &mut AgentContext<'_>) -> AgentResult {
        let me = ctx.direct_mbox();
        ctx.subscribe(&me).event(Self::on_result)?;
        ctx.subscribe(&me)
            .signal::<GameOver, _, _, _>(Self::on_game_over)?;
        self.me = Some(me);
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        self.request_meeting();
        Ok(())
    }
}

impl Creature {
    fn request_meeting(&self) {
        if let Some(me) = &self.me {
            self.place.deliver(MeetingRequest {
                who: me.clone(),
                color: self.color,
            });
        }
    }

    fn on_result(&mut self, _ctx: &mut AgentContext<'_>, msg: &MeetingResult) -> AgentResult {
        self.color = complement(self.color, msg.other);
        self.meetings += 1;
        self.request_meeting();
        Ok(())
    }

    fn on_game_over(&mut self, _ctx: &mut AgentContext<'_>) -> AgentResult {
        self.place.deliver(CountReport {
            meetings: self.meetings,
        });
        Ok(())
    }
}

#[test]
fn chameneos_meeting_counts_sum_to_twice_the_limit() {
    let total = Arc::new(AtomicUsize::new(0));
    let sum = Arc::clone(&total);

    let params = EnvParams::default()
        .add_named_dispatcher("active_obj", ActiveObjDispatcher::new());
    let result = launch_with_params(params, move |env| {
        let place_inbox = env.create_mbox();
        let mut coop =
            env.create_coop_with_binder("chameneos", ActiveObjBinder::new("active_obj"));
        coop.add_agent(MeetingPlace {
            inbox: place_inbox.clone(),
            waiting: None,
            left: MEETINGS,
            reports: 0,
            total: sum,
        });
        for color in [Color::Blue, Color::Red, Color::Yellow, Color::Blue] {
            coop.add_agent(Creature {
                place: place_inbox.clone(),
                color,
                me: None,
                meetings: 0,
            });
        }
        env.register_coop(coop)?;
        Ok(())
    });

    assert!(result.is_ok(), "launch failed: {result:?}");
    assert_eq!(total.load(Ordering::SeqCst), 2 * MEETINGS);
}

#[test]
fn color_complement_rule() {
    use Color::{Blue, Red, Yellow};

    assert_eq!(complement(Blue, Red), Yellow);
    assert_eq!(complement(Blue, Yellow), Red);
    assert_eq!(complement(Red, Yellow), Blue);
    assert_eq!(complement(Red, Red), Red);
    assert_eq!(complement(Yellow, Yellow), Yellow);
}

#![allow(dead_code)]

use msgbox::{Event, Reactor};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub const TICK: Duration = Duration::from_millis(10);
const MAX_TICKS: usize = 500;

/// Events seen by a callback, with their payload as text.
pub type Seen = Rc<RefCell<Vec<(Event, String)>>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ticks until `done` holds, giving up after a few seconds.
pub fn run_until<C: Clone + 'static, R: 'static>(
    reactor: &mut Reactor<C, R>,
    mut done: impl FnMut() -> bool,
) -> bool {
    for _ in 0..MAX_TICKS {
        reactor.tick(TICK);
        if done() {
            return true;
        }
    }
    false
}

pub fn saw(seen: &Seen, event: Event) -> bool {
    seen.borrow().iter().any(|(e, _)| *e == event)
}

pub fn payloads(seen: &Seen, event: Event) -> Vec<String> {
    seen.borrow()
        .iter()
        .filter(|(e, _)| *e == event)
        .map(|(_, text)| text.clone())
        .collect()
}

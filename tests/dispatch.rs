mod common;

use common::{Seen, TICK, init_logging, saw};
use msgbox::{Conn, ConnId, Data, Error, Event, Reactor};
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

fn recorder(seen: &Seen) -> impl FnMut(&mut Reactor, &Conn<(), ()>, Event, Data) + 'static {
    let seen = Rc::clone(seen);
    move |_, _, event, data| seen.borrow_mut().push((event, data.as_str().into_owned()))
}

fn events(seen: &Seen) -> Vec<Event> {
    seen.borrow().iter().map(|(event, _)| *event).collect()
}

#[test]
fn callbacks_registered_during_a_drain_wait_for_the_next_tick() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let inner_seen: Seen = Rc::default();

    let inner = Rc::clone(&inner_seen);
    reactor
        .listen("udp://127.0.0.1:0", (), move |reactor, _, event, _| {
            if event == Event::Listening {
                reactor
                    .listen("udp://127.0.0.1:0", (), recorder(&inner))
                    .unwrap();
            }
        })
        .unwrap();

    assert_eq!(reactor.tick(TICK), 1);
    assert!(inner_seen.borrow().is_empty());
    assert_eq!(reactor.len(), 2);

    assert_eq!(reactor.tick(TICK), 1);
    assert_eq!(events(&inner_seen), vec![Event::Listening]);

    assert_eq!(reactor.tick(TICK), 0);
}

#[test]
fn tick_from_inside_a_callback_does_nothing() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let nested = Rc::new(Cell::new(None));

    let result = Rc::clone(&nested);
    reactor
        .listen("udp://127.0.0.1:0", (), move |reactor, _, _, _| {
            result.set(Some(reactor.tick(TICK)));
        })
        .unwrap();

    assert_eq!(reactor.tick(TICK), 1);
    assert_eq!(nested.get(), Some(0));
}

#[test]
fn lifecycle_events_follow_disconnect_and_unlisten() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let server_seen: Seen = Rc::default();
    let client_seen: Seen = Rc::default();

    let server = reactor
        .listen("udp://127.0.0.1:0", (), recorder(&server_seen))
        .unwrap();
    let port = reactor.local_addr(server).unwrap().port();
    let client = reactor
        .connect(&format!("udp://127.0.0.1:{port}"), (), recorder(&client_seen))
        .unwrap();
    reactor.tick(TICK);

    reactor.disconnect(client).unwrap();
    reactor.unlisten(server).unwrap();
    assert!(reactor.is_empty());
    assert_eq!(events(&client_seen), vec![Event::ConnectionReady]);

    assert_eq!(reactor.tick(TICK), 2);
    assert_eq!(
        events(&client_seen),
        vec![Event::ConnectionReady, Event::ConnectionClosed]
    );
    assert_eq!(events(&server_seen), vec![Event::Listening, Event::ListeningEnded]);
}

#[test]
fn events_queued_before_removal_are_still_delivered() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();

    let listener = reactor
        .listen("udp://127.0.0.1:0", (), recorder(&seen))
        .unwrap();
    reactor.unlisten(listener).unwrap();

    assert_eq!(reactor.tick(TICK), 2);
    assert_eq!(events(&seen), vec![Event::Listening, Event::ListeningEnded]);
}

#[test]
fn removal_during_a_drain_keeps_events_already_being_delivered() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();
    let second_id: Rc<Cell<Option<ConnId>>> = Rc::default();

    let target = Rc::clone(&second_id);
    reactor
        .listen("udp://127.0.0.1:0", (), move |reactor, _, event, _| {
            if let (Event::Listening, Some(id)) = (event, target.get()) {
                reactor.unlisten(id).unwrap();
            }
        })
        .unwrap();
    let second = reactor
        .listen("udp://127.0.0.1:0", (), recorder(&seen))
        .unwrap();
    second_id.set(Some(second));

    assert_eq!(reactor.tick(TICK), 2);
    assert!(!reactor.contains(second));
    assert_eq!(events(&seen), vec![Event::Listening]);

    assert_eq!(reactor.tick(TICK), 1);
    assert_eq!(events(&seen), vec![Event::Listening, Event::ListeningEnded]);
}

#[test]
fn panicking_callback_does_not_wedge_the_reactor() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();

    reactor
        .listen("udp://127.0.0.1:0", (), |_, _, _, _| panic!("callback failed"))
        .unwrap();
    reactor
        .listen("udp://127.0.0.1:0", (), recorder(&seen))
        .unwrap();

    let unwound = panic::catch_unwind(AssertUnwindSafe(|| reactor.tick(TICK)));
    assert!(unwound.is_err());
    assert!(seen.borrow().is_empty());

    // The interrupted drain picks up where it stopped.
    assert_eq!(reactor.tick(TICK), 1);
    assert_eq!(events(&seen), vec![Event::Listening]);
}

#[test]
fn callback_may_disconnect_its_own_connection() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();

    let record = Rc::clone(&seen);
    reactor
        .listen("udp://127.0.0.1:0", (), move |reactor, conn, event, data| {
            record.borrow_mut().push((event, data.as_str().into_owned()));
            if event == Event::Listening {
                reactor.unlisten(conn.id).unwrap();
            }
        })
        .unwrap();

    reactor.tick(TICK);
    assert!(reactor.is_empty());
    assert!(!saw(&seen, Event::ListeningEnded));

    reactor.tick(TICK);
    assert_eq!(events(&seen), vec![Event::Listening, Event::ListeningEnded]);
}

#[test]
fn stale_handles_are_rejected() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();

    let first = reactor
        .listen("udp://127.0.0.1:0", (), |_, _, _, _| {})
        .unwrap();
    reactor.unlisten(first).unwrap();
    let second = reactor
        .listen("udp://127.0.0.1:0", (), |_, _, _, _| {})
        .unwrap();

    assert_ne!(first, second);
    assert!(!reactor.contains(first));
    assert!(reactor.contains(second));
    assert!(matches!(
        reactor.disconnect(first),
        Err(Error::UnknownConnection(id)) if id == first
    ));
    assert!(matches!(
        reactor.send(first, &mut Data::from_text("late")),
        Err(Error::UnknownConnection(_))
    ));
    assert!(reactor.local_addr(first).is_err());
}

#[test]
fn callbacks_run_in_enqueue_order() {
    init_logging();
    let mut reactor: Reactor<u8> = Reactor::new();
    let order: Rc<RefCell<Vec<(u8, Event)>>> = Rc::default();

    let mut ids: Vec<ConnId> = Vec::new();
    for context in 1..=3 {
        let order = Rc::clone(&order);
        let id = reactor
            .listen("udp://127.0.0.1:0", context, move |_, conn, event, _| {
                order.borrow_mut().push((conn.context, event));
            })
            .unwrap();
        ids.push(id);
    }
    reactor.unlisten(ids[1]).unwrap();

    assert_eq!(reactor.tick(TICK), 4);
    assert_eq!(
        *order.borrow(),
        vec![
            (1, Event::Listening),
            (2, Event::Listening),
            (3, Event::Listening),
            (2, Event::ListeningEnded),
        ]
    );
}

mod common;

use common::{Seen, TICK, init_logging, payloads};
use msgbox::{Conn, Data, Event, Reactor};
use std::rc::Rc;

fn record(seen: &Seen) -> impl FnMut(&mut Reactor, &Conn<(), ()>, Event, Data) + 'static {
    let seen = Rc::clone(seen);
    move |_, _, event, data| seen.borrow_mut().push((event, data.as_str().into_owned()))
}

#[test]
fn bad_address_is_reported_through_the_callback() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();

    assert!(reactor.connect("foo://1.2.3.4:80", (), record(&seen)).is_none());
    assert_eq!(reactor.len(), 0);
    assert!(seen.borrow().is_empty());

    assert_eq!(reactor.tick(TICK), 1);
    let errors = payloads(&seen, Event::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("unrecognized prefix"), "{}", errors[0]);
}

#[test]
fn every_malformed_address_leaves_nothing_registered() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();

    for address in [
        "tcp://1.2.3.4",
        "udp://:80",
        "udp://1.2.3.4:",
        "tcp://999.1.1.1:80",
        "udp://1.2.3.4:http",
    ] {
        assert!(reactor.listen(address, (), record(&seen)).is_none(), "{address}");
    }

    assert!(reactor.is_empty());
    assert_eq!(reactor.tick(TICK), 5);
    assert_eq!(payloads(&seen, Event::Error).len(), 5);
}

#[test]
fn second_listener_on_a_taken_port_fails_to_bind() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();

    let first = reactor
        .listen("udp://127.0.0.1:0", (), record(&seen))
        .unwrap();
    let port = reactor.local_addr(first).unwrap().port();

    let second = reactor.listen(&format!("udp://127.0.0.1:{port}"), (), record(&seen));
    assert!(second.is_none());
    assert_eq!(reactor.len(), 1);

    reactor.tick(TICK);
    let errors = payloads(&seen, Event::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("bind:"), "{}", errors[0]);
}

#[test]
fn refused_tcp_connect_is_an_error() {
    init_logging();
    let port = {
        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        unused.local_addr().unwrap().port()
    };

    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();
    let client = reactor.connect(&format!("tcp://127.0.0.1:{port}"), (), record(&seen));

    assert!(client.is_none());
    assert!(reactor.is_empty());
    reactor.tick(TICK);
    let errors = payloads(&seen, Event::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("connect:"), "{}", errors[0]);
}

#[test]
fn wildcard_listener_reports_its_port() {
    init_logging();
    let mut reactor: Reactor = Reactor::new();
    let seen: Seen = Rc::default();

    let listener = reactor.listen("tcp://*:0", (), record(&seen)).unwrap();
    let local = reactor.local_addr(listener).unwrap();

    assert!(local.ip().is_unspecified());
    assert_ne!(local.port(), 0);
    reactor.tick(TICK);
    assert_eq!(payloads(&seen, Event::Listening), vec![String::new()]);
}

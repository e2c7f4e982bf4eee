//! Request/reply correlation ids.
//!
//! The 16-bit `reply_id` header field packs a reply tag in bit 15 and a 15-bit correlation
//! id below it. Id `0` marks a one-way message.

use crate::reactor::event::Event;

/// The `reply_id` of a one-way message.
pub const NO_CORRELATION: u16 = 0;
/// Bit set on the `reply_id` of a reply.
pub const REPLY_TAG: u16 = 1 << 15;
/// Largest correlation id; the counter wraps back to 1 after it.
pub const MAX_CORRELATION_ID: u16 = REPLY_TAG - 1;

/// How a frame relates to a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correlation {
    OneWay,
    Request(u16),
    Reply(u16),
}

impl Correlation {
    pub fn from_wire(reply_id: u16) -> Self {
        if reply_id & REPLY_TAG != 0 {
            Correlation::Reply(reply_id & MAX_CORRELATION_ID)
        } else if reply_id == NO_CORRELATION {
            Correlation::OneWay
        } else {
            Correlation::Request(reply_id)
        }
    }

    pub fn to_wire(self) -> u16 {
        match self {
            Correlation::OneWay => NO_CORRELATION,
            Correlation::Request(id) => id & MAX_CORRELATION_ID,
            Correlation::Reply(id) => (id & MAX_CORRELATION_ID) | REPLY_TAG,
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Correlation::OneWay => NO_CORRELATION,
            Correlation::Request(id) | Correlation::Reply(id) => id,
        }
    }

    pub fn is_reply(self) -> bool {
        matches!(self, Correlation::Reply(_))
    }

    /// The event a received frame with this correlation produces.
    pub fn event(self) -> Event {
        match self {
            Correlation::OneWay => Event::Message,
            Correlation::Request(_) => Event::Request,
            Correlation::Reply(_) => Event::Reply,
        }
    }
}

/// Per-connection counter handing out request ids in `1..=MAX_CORRELATION_ID`.
#[derive(Debug)]
pub struct ReplyIds {
    next: u16,
}

impl ReplyIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u16 {
        let id = self.next;
        self.next = if id >= MAX_CORRELATION_ID { 1 } else { id + 1 };
        id
    }
}

impl Default for ReplyIds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut ids = ReplyIds::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn ids_wrap_after_maximum() {
        let mut ids = ReplyIds::new();
        for expected in 1..=MAX_CORRELATION_ID {
            assert_eq!(ids.next_id(), expected);
        }
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn wire_values_classify_into_events() {
        assert_eq!(Correlation::from_wire(0).event(), Event::Message);
        assert_eq!(Correlation::from_wire(5).event(), Event::Request);
        assert_eq!(Correlation::from_wire(5 | REPLY_TAG).event(), Event::Reply);
    }

    #[test]
    fn reply_tag_round_trip() {
        let reply = Correlation::Reply(MAX_CORRELATION_ID);
        let parsed = Correlation::from_wire(reply.to_wire());

        assert!(parsed.is_reply());
        assert_eq!(parsed.id(), MAX_CORRELATION_ID);
        assert_eq!(reply.to_wire(), u16::MAX);
    }
}

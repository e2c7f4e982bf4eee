use std::fmt;

/// What a callback invocation is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// A one-way message arrived.
    Message,
    /// A message expecting a reply arrived.
    Request,
    /// An answer to one of our requests arrived; the reply context is set.
    Reply,
    Listening,
    ListeningEnded,
    ConnectionReady,
    /// The connection was closed by a local disconnect.
    ConnectionClosed,
    /// The peer went away.
    ConnectionLost,
    /// The payload holds the error description.
    Error,
}

impl Event {
    pub const fn name(self) -> &'static str {
        match self {
            Event::Message => "message",
            Event::Request => "request",
            Event::Reply => "reply",
            Event::Listening => "listening",
            Event::ListeningEnded => "listening-ended",
            Event::ConnectionReady => "connection-ready",
            Event::ConnectionClosed => "connection-closed",
            Event::ConnectionLost => "connection-lost",
            Event::Error => "error",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

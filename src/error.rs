use crate::net::address::AddressError;
use crate::reactor::connection::ConnId;

use std::io;
use thiserror::Error;

/// Everything that can go wrong inside the reactor.
///
/// Errors tied to a connection reach its callback as [`Event::Error`](crate::Event::Error)
/// payloads rendered with `Display`; handle misuse is returned directly.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("{op}: {source}")]
    Socket {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("internal error during '{op}': {source}")]
    Internal {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("unknown connection {0}")]
    UnknownConnection(ConnId),
}

impl Error {
    pub(crate) fn socket(op: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Socket { op, source }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether this is a socket call that found nothing to do and may simply be retried later.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Socket { source, .. }
                if matches!(
                    source.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                )
        )
    }
}

//! Turning failures into error events.
//!
//! Failures tied to a connection become [`Event::Error`] callbacks carrying the error text.
//! Failures no connection can be blamed for only reach the log.

use crate::data::Data;
use crate::error::Error;
use crate::reactor::connection::ConnId;
use crate::reactor::core::Reactor;
use crate::reactor::event::Event;
use crate::reactor::queue::{PendingCallback, Target};

use log::{error, warn};
use std::io;

impl<C: Clone + 'static, R: 'static> Reactor<C, R> {
    pub(crate) fn signal(&mut self, target: Target<C, R>, err: Error) {
        let data = error_payload(target.id(), &err);
        self.queue.enqueue(PendingCallback::new(target, Event::Error, data));
    }

    /// Reports a failed OS call as `"<op>: <os description>"`.
    pub(crate) fn report_os_error(
        &mut self,
        target: Target<C, R>,
        op: &'static str,
        source: io::Error,
    ) {
        self.signal(target, Error::Socket { op, source });
    }

    pub(crate) fn report_protocol_error(
        &mut self,
        target: Target<C, R>,
        message: impl Into<String>,
    ) {
        self.signal(target, Error::protocol(message));
    }
}

/// Logs `err` and renders it as an error event payload.
pub(crate) fn error_payload(id: ConnId, err: &Error) -> Data {
    warn!("connection {id}: {err}");
    Data::from_text(&err.to_string())
}

pub(crate) fn report_internal(op: &'static str, source: io::Error) {
    error!("{}", Error::Internal { op, source });
}

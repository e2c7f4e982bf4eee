//! The receive path: what happens to a socket `poll` reported as ready.

use crate::data::Data;
use crate::error::Error;
use crate::net::address::Protocol;
use crate::protocol::correlation::Correlation;
use crate::protocol::framing;
use crate::protocol::header::Header;
use crate::reactor::connection::ConnId;
use crate::reactor::core::Reactor;
use crate::reactor::event::Event;
use crate::reactor::poller::Readiness;
use crate::reactor::queue::{PendingCallback, Target};
use crate::reactor::signal::{error_payload, report_internal};

use log::{debug, info, trace};
use std::io;
use std::rc::Rc;

impl<C: Clone + 'static, R: 'static> Reactor<C, R> {
    pub(super) fn on_ready(&mut self, id: ConnId, readiness: Readiness) {
        if self.registry.get(id).is_none() {
            return;
        }

        if readiness.invalid {
            report_internal("poll", io::Error::from_raw_os_error(libc::EBADF));
            self.retire(id, Event::ConnectionLost);
            return;
        }
        if readiness.writable {
            self.flush_outbound(id);
        }
        if !readiness.readable {
            return;
        }

        let Some(entry) = self.registry.get(id) else {
            return;
        };
        match (entry.connection.protocol, entry.connection.listening) {
            (Protocol::Tcp, true) => self.accept_peer(id),
            (Protocol::Tcp, false) => self.read_stream(id),
            (Protocol::Udp, _) => self.read_datagram(id),
        }
    }

    fn read_datagram(&mut self, id: ConnId) {
        let buffer_len = self.config.recv_buffer_len;
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };

        let header = match framing::peek_header(&entry.socket) {
            Ok(header) => header,
            Err(err) if err.is_transient() => return,
            Err(err) => {
                // A malformed datagram is still queued; drop it so it isn't read again.
                if matches!(err, Error::Protocol(_))
                    && let Err(discard) = entry.socket.discard()
                {
                    debug!("connection {id}: failed to discard datagram: {discard}");
                }
                self.signal(Target::Live(id), err);
                return;
            }
        };

        if !header.is_single_packet() {
            if let Err(discard) = entry.socket.discard() {
                debug!("connection {id}: failed to discard datagram: {discard}");
            }
            self.signal(Target::Live(id), multi_packet(&header));
            return;
        }

        let (data, sender) = match framing::receive_datagram(&entry.socket, buffer_len) {
            Ok(received) => received,
            Err(err) if err.is_transient() => return,
            Err(err) => {
                self.signal(Target::Live(id), err);
                return;
            }
        };

        let connection = &mut entry.connection;
        let correlation = header.correlation();
        let (event, reply_context) = connection.on_received(correlation);
        let sender_to_answer = connection.listening.then_some(sender);
        trace!("connection {id}: {event} of {} bytes from {sender}", data.len());

        self.queue.enqueue(
            PendingCallback::live(id, event, data)
                .with_reply_context(reply_context)
                .with_origin(request_id(correlation), sender_to_answer),
        );
    }

    fn read_stream(&mut self, id: ConnId) {
        let buffer_len = self.config.recv_buffer_len;
        let max_frame_len = self.config.max_frame_len;
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };

        let mut chunk = vec![0u8; buffer_len];
        let received = match entry.socket.recv(&mut chunk) {
            Ok(0) => {
                debug!("connection {id}: peer closed the stream");
                self.retire(id, Event::ConnectionLost);
                return;
            }
            Ok(received) => received,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                return;
            }
            Err(err) => {
                self.report_os_error(Target::Live(id), "recv", err);
                return;
            }
        };

        let connection = &mut entry.connection;
        connection.inbound.extend_from_slice(&chunk[..received]);

        let mut events = Vec::new();
        let broken = loop {
            match framing::split_frame(&mut connection.inbound, max_frame_len) {
                Ok(Some(frame)) => match Header::decode(&frame) {
                    Ok(header) if header.is_single_packet() => {
                        let correlation = header.correlation();
                        let (event, reply_context) = connection.on_received(correlation);
                        trace!("connection {id}: {event} of {} bytes", frame.len());
                        events.push(
                            PendingCallback::live(id, event, Data::from_frame(frame))
                                .with_reply_context(reply_context)
                                .with_origin(request_id(correlation), None),
                        );
                    }
                    Ok(header) => {
                        let payload = error_payload(id, &multi_packet(&header));
                        events.push(PendingCallback::live(id, Event::Error, payload));
                    }
                    Err(err) => events.push(PendingCallback::live(
                        id,
                        Event::Error,
                        error_payload(id, &err),
                    )),
                },
                Ok(None) => break None,
                Err(err) => break Some(err),
            }
        };

        let Some(err) = broken else {
            for pending in events {
                self.queue.enqueue(pending);
            }
            return;
        };

        // The stream can't be resynchronised; deliver what was read, then drop the peer.
        let Some(connection) = self.remove(id) else {
            return;
        };
        events.push(PendingCallback::live(id, Event::Error, error_payload(id, &err)));
        events.push(PendingCallback::live(id, Event::ConnectionLost, Data::empty()));
        for mut pending in events {
            pending.target = Target::Retired(id, Rc::clone(&connection));
            self.queue.enqueue(pending);
        }
    }

    fn accept_peer(&mut self, id: ConnId) {
        let Some(entry) = self.registry.get(id) else {
            return;
        };

        match entry.socket.accept() {
            Ok((socket, peer)) => {
                let connection = entry.connection.accepted(peer);
                if let Err(err) = socket.set_nonblocking() {
                    self.report_os_error(Target::Live(id), "fcntl", err);
                    return;
                }
                let peer_id = self.registry.insert(connection, socket);
                info!("connection {id} accepted {peer} as {peer_id}");

                self.queue.enqueue(PendingCallback::live(
                    peer_id,
                    Event::ConnectionReady,
                    Data::empty(),
                ));
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) => {}
            Err(err) => self.report_os_error(Target::Live(id), "accept", err),
        }
    }
}

fn request_id(correlation: Correlation) -> Option<u16> {
    match correlation {
        Correlation::Request(id) => Some(id),
        _ => None,
    }
}

fn multi_packet(header: &Header) -> Error {
    Error::protocol(format!(
        "multi-packet messages are not supported (num_packets={})",
        header.num_packets()
    ))
}

//! The stream send path.
//!
//! Stream sockets are non-blocking. Whatever a frame's `sendmsg` leaves unsent waits in the
//! connection's outbound buffer, and the poller watches the socket for writability until the
//! buffer is empty again.

use crate::error::Error;
use crate::net::address::Protocol;
use crate::net::socket::Socket;
use crate::reactor::connection::ConnId;
use crate::reactor::core::Reactor;
use crate::reactor::queue::Target;

use log::trace;
use std::io;

/// Sends one stream frame, buffering what the socket doesn't take.
///
/// Bytes already waiting in `outbound` go out first, so a new frame is only written straight
/// to the socket when nothing is buffered.
///
/// # Arguments
/// * `socket` - Connected stream socket
/// * `outbound` - The connection's unsent bytes
/// * `parts` - The frame, as slices written back to back
/// * `limit` - Most bytes `outbound` may hold afterwards
///
/// # Returns
/// Ok once the whole frame is written or buffered, or the error that kept it from either
pub(crate) fn write_stream(
    socket: &Socket,
    outbound: &mut Vec<u8>,
    parts: [&[u8]; 2],
    limit: usize,
) -> Result<(), Error> {
    let total: usize = parts.iter().map(|part| part.len()).sum();
    if outbound.len() + total > limit {
        return Err(Error::protocol(format!(
            "send buffer full: {} bytes waiting, frame of {total} bytes, limit {limit}",
            outbound.len()
        )));
    }

    let mut sent = 0;
    if outbound.is_empty() {
        sent = match socket.send_vectored(&parts) {
            Ok(sent) => sent,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => 0,
            Err(source) => return Err(Error::Socket { op: "send", source }),
        };
    }

    let mut skip = sent;
    for part in parts {
        let taken = skip.min(part.len());
        outbound.extend_from_slice(&part[taken..]);
        skip -= taken;
    }

    Ok(())
}

impl<C: Clone + 'static, R: 'static> Reactor<C, R> {
    /// Writes buffered stream bytes until the socket stops taking them.
    pub(super) fn flush_outbound(&mut self, id: ConnId) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        if entry.connection.protocol != Protocol::Tcp {
            return;
        }

        let outbound = &mut entry.connection.outbound;
        while !outbound.is_empty() {
            match entry.socket.send(outbound) {
                Ok(sent) => {
                    outbound.drain(..sent);
                    trace!("connection {id}: flushed {sent} bytes, {} left", outbound.len());
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    return;
                }
                Err(err) => {
                    // Nothing buffered can reach the peer any more.
                    outbound.clear();
                    self.report_os_error(Target::Live(id), "send", err);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_buffer_refuses_the_frame() {
        let socket = Socket::open(Protocol::Tcp).unwrap();
        let mut outbound = vec![0u8; 10];

        let err = write_stream(&socket, &mut outbound, [&[1, 2], &[3, 4, 5]], 12).unwrap_err();
        assert!(err.to_string().contains("send buffer full"), "{err}");
        assert_eq!(outbound.len(), 10);
    }

    #[test]
    fn pending_bytes_keep_new_frames_behind_them() {
        // Never written to: anything already buffered means the frame must queue up.
        let socket = Socket::open(Protocol::Tcp).unwrap();
        let mut outbound = vec![9];

        write_stream(&socket, &mut outbound, [&[1, 2], &[3]], 64).unwrap();
        assert_eq!(outbound, vec![9, 1, 2, 3]);
    }

}

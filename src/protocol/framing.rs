//! Moving frames between sockets and [`Data`] buffers.
//!
//! UDP carries one frame per datagram. TCP streams prefix each frame with its length as a
//! big-endian `u32`, covering header and payload.

use crate::data::{Data, HEADER_LEN};
use crate::error::Error;
use crate::net::socket::Socket;
use crate::protocol::header::Header;

use std::net::SocketAddrV4;

pub(crate) const LENGTH_PREFIX_LEN: usize = 4;

/// Reads the header of the next datagram without consuming it.
pub(crate) fn peek_header(socket: &Socket) -> Result<Header, Error> {
    let mut buffer = [0u8; HEADER_LEN];
    let received = socket.peek(&mut buffer).map_err(Error::socket("recv"))?;

    Header::decode(&buffer[..received])
}

/// Consumes one datagram, keeping its header in front of the returned payload.
///
/// Datagrams longer than `buffer_len` are consumed and rejected rather than truncated.
pub(crate) fn receive_datagram(
    socket: &Socket,
    buffer_len: usize,
) -> Result<(Data, SocketAddrV4), Error> {
    let limit = buffer_len.max(HEADER_LEN);
    // One spare byte tells a datagram that filled the buffer from one that overflowed it.
    let mut frame = vec![0u8; limit + 1];
    let (received, sender) = socket
        .recv_from(&mut frame)
        .map_err(Error::socket("recvfrom"))?;

    if received > limit {
        return Err(Error::protocol(format!(
            "datagram from {sender} exceeds the {limit}-byte receive buffer"
        )));
    }
    if received < HEADER_LEN {
        return Err(Error::protocol(format!(
            "datagram of {received} bytes is shorter than the {HEADER_LEN}-byte header"
        )));
    }
    frame.truncate(received);

    Ok((Data::from_frame(frame), sender))
}

pub(crate) fn length_prefix(data: &Data) -> [u8; LENGTH_PREFIX_LEN] {
    (data.frame().len() as u32).to_be_bytes()
}

/// Removes the next complete frame from the front of a stream buffer.
///
/// Returns `Ok(None)` while the frame is still incomplete.
pub(crate) fn split_frame(
    inbound: &mut Vec<u8>,
    max_frame_len: usize,
) -> Result<Option<Vec<u8>>, Error> {
    if inbound.len() < LENGTH_PREFIX_LEN {
        return Ok(None);
    }

    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    prefix.copy_from_slice(&inbound[..LENGTH_PREFIX_LEN]);
    let frame_len = u32::from_be_bytes(prefix) as usize;

    if frame_len < HEADER_LEN {
        return Err(Error::protocol(format!(
            "stream frame of {frame_len} bytes is shorter than the {HEADER_LEN}-byte header"
        )));
    }
    if frame_len > max_frame_len {
        return Err(Error::protocol(format!(
            "stream frame of {frame_len} bytes exceeds the {max_frame_len}-byte limit"
        )));
    }

    let end = LENGTH_PREFIX_LEN + frame_len;
    if inbound.len() < end {
        return Ok(None);
    }

    let frame = inbound[LENGTH_PREFIX_LEN..end].to_vec();
    inbound.drain(..end);

    Ok(Some(frame))
}

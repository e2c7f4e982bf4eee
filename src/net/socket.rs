//! Owned IPv4 socket handle over raw `libc` calls.
//!
//! Sockets are switched to non-blocking mode once they are set up; only `connect` runs in
//! blocking mode.

use crate::net::address::{Protocol, from_sockaddr, to_sockaddr};

use libc::{
    AF_INET, F_GETFL, F_SETFL, MSG_PEEK, O_NONBLOCK, POLLOUT, SO_ERROR, SO_REUSEADDR, SOL_SOCKET,
    accept, bind, c_int, c_void, close, connect, fcntl, getsockname, getsockopt, iovec, listen,
    msghdr, poll, pollfd, recv, recvfrom, send, sendmsg, sendto, setsockopt, sockaddr,
    sockaddr_in, socket, socklen_t,
};
use std::io;
use std::mem;
use std::net::SocketAddrV4;
use std::os::unix::io::RawFd;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

const SOCKADDR_LEN: socklen_t = mem::size_of::<sockaddr_in>() as socklen_t;

#[derive(Debug)]
pub(crate) struct Socket {
    file_descriptor: RawFd,
}

impl Socket {
    pub(crate) fn open(protocol: Protocol) -> io::Result<Self> {
        let file_descriptor = unsafe { socket(AF_INET, protocol.socket_type(), 0) };
        if file_descriptor < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { file_descriptor })
    }

    pub(crate) fn file_descriptor(&self) -> RawFd {
        self.file_descriptor
    }

    pub(crate) fn set_reuse_address(&self) -> io::Result<()> {
        let enable: c_int = 1;
        let ret = unsafe {
            setsockopt(
                self.file_descriptor,
                SOL_SOCKET,
                SO_REUSEADDR,
                &enable as *const c_int as *const c_void,
                mem::size_of::<c_int>() as socklen_t,
            )
        };

        check(ret).map(drop)
    }

    /// Switches the socket to non-blocking mode.
    pub(crate) fn set_nonblocking(&self) -> io::Result<()> {
        let flags = check(unsafe { fcntl(self.file_descriptor, F_GETFL) })?;
        let ret = unsafe { fcntl(self.file_descriptor, F_SETFL, flags | O_NONBLOCK) };

        check(ret).map(drop)
    }

    pub(crate) fn bind(&self, address: SocketAddrV4) -> io::Result<()> {
        let raw = to_sockaddr(address);
        let ret = unsafe {
            bind(
                self.file_descriptor,
                &raw as *const sockaddr_in as *const sockaddr,
                SOCKADDR_LEN,
            )
        };

        check(ret).map(drop)
    }

    /// Connects to `address`, blocking until the handshake completes.
    ///
    /// An interrupted `connect` keeps going in the background and must not be reissued, so it
    /// is awaited through `poll` and its outcome read back with `SO_ERROR`.
    pub(crate) fn connect(&self, address: SocketAddrV4) -> io::Result<()> {
        let raw = to_sockaddr(address);
        let ret = unsafe {
            connect(
                self.file_descriptor,
                &raw as *const sockaddr_in as *const sockaddr,
                SOCKADDR_LEN,
            )
        };

        match check(ret) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => self.finish_connect(),
            other => other.map(drop),
        }
    }

    fn finish_connect(&self) -> io::Result<()> {
        let mut pending = pollfd {
            fd: self.file_descriptor,
            events: POLLOUT,
            revents: 0,
        };
        loop {
            match check(unsafe { poll(&mut pending, 1, -1) }) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                other => {
                    other?;
                    break;
                }
            }
        }

        match self.take_error()? {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Reads and clears the socket's pending error (`SO_ERROR`).
    pub(crate) fn take_error(&self) -> io::Result<Option<io::Error>> {
        let mut code: c_int = 0;
        let mut length = mem::size_of::<c_int>() as socklen_t;
        let ret = unsafe {
            getsockopt(
                self.file_descriptor,
                SOL_SOCKET,
                SO_ERROR,
                &mut code as *mut c_int as *mut c_void,
                &mut length,
            )
        };
        check(ret)?;

        Ok((code != 0).then(|| io::Error::from_raw_os_error(code)))
    }

    pub(crate) fn listen(&self, backlog: i32) -> io::Result<()> {
        let ret = unsafe { listen(self.file_descriptor, backlog) };

        check(ret).map(drop)
    }

    pub(crate) fn accept(&self) -> io::Result<(Socket, SocketAddrV4)> {
        let mut raw: sockaddr_in = unsafe { mem::zeroed() };
        let mut length = SOCKADDR_LEN;
        let file_descriptor = unsafe {
            accept(
                self.file_descriptor,
                &mut raw as *mut sockaddr_in as *mut sockaddr,
                &mut length,
            )
        };
        if file_descriptor < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok((Socket { file_descriptor }, from_sockaddr(&raw)))
    }

    pub(crate) fn local_addr(&self) -> io::Result<SocketAddrV4> {
        let mut raw: sockaddr_in = unsafe { mem::zeroed() };
        let mut length = SOCKADDR_LEN;
        let ret = unsafe {
            getsockname(
                self.file_descriptor,
                &mut raw as *mut sockaddr_in as *mut sockaddr,
                &mut length,
            )
        };
        check(ret)?;

        Ok(from_sockaddr(&raw))
    }

    /// Reads the front of the next datagram without consuming it.
    pub(crate) fn peek(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let ret = unsafe {
            recv(
                self.file_descriptor,
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len(),
                MSG_PEEK,
            )
        };

        check_len(ret)
    }

    pub(crate) fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let ret = unsafe {
            recv(
                self.file_descriptor,
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len(),
                0,
            )
        };

        check_len(ret)
    }

    pub(crate) fn recv_from(&self, buffer: &mut [u8]) -> io::Result<(usize, SocketAddrV4)> {
        let mut raw: sockaddr_in = unsafe { mem::zeroed() };
        let mut length = SOCKADDR_LEN;
        let ret = unsafe {
            recvfrom(
                self.file_descriptor,
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len(),
                0,
                &mut raw as *mut sockaddr_in as *mut sockaddr,
                &mut length,
            )
        };
        let received = check_len(ret)?;

        Ok((received, from_sockaddr(&raw)))
    }

    /// Consumes and drops the next datagram.
    pub(crate) fn discard(&self) -> io::Result<()> {
        let mut scratch = [0u8; 1];
        self.recv(&mut scratch).map(drop)
    }

    pub(crate) fn send(&self, bytes: &[u8]) -> io::Result<usize> {
        let ret = unsafe {
            send(
                self.file_descriptor,
                bytes.as_ptr() as *const c_void,
                bytes.len(),
                SEND_FLAGS,
            )
        };

        check_len(ret)
    }

    pub(crate) fn send_to(&self, bytes: &[u8], address: SocketAddrV4) -> io::Result<usize> {
        let raw = to_sockaddr(address);
        let ret = unsafe {
            sendto(
                self.file_descriptor,
                bytes.as_ptr() as *const c_void,
                bytes.len(),
                SEND_FLAGS,
                &raw as *const sockaddr_in as *const sockaddr,
                SOCKADDR_LEN,
            )
        };

        check_len(ret)
    }

    /// Writes as much of `parts`, in order, as the socket takes in one `sendmsg`.
    ///
    /// # Arguments
    /// * `parts` - Byte slices sent back to back as one stream segment
    ///
    /// # Returns
    /// The number of bytes written, which may be fewer than the total, or an I/O error
    /// (`WouldBlock` when the send buffer is full)
    pub(crate) fn send_vectored(&self, parts: &[&[u8]]) -> io::Result<usize> {
        let mut iovecs: Vec<iovec> = parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| iovec {
                iov_base: part.as_ptr() as *mut c_void,
                iov_len: part.len(),
            })
            .collect();

        let mut message: msghdr = unsafe { mem::zeroed() };
        message.msg_iov = iovecs.as_mut_ptr();
        message.msg_iovlen = iovecs.len() as _;

        loop {
            let ret = unsafe { sendmsg(self.file_descriptor, &message, SEND_FLAGS) };
            match check_len(ret) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        unsafe {
            close(self.file_descriptor);
        }
    }
}

fn check(ret: c_int) -> io::Result<c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

fn check_len(ret: isize) -> io::Result<usize> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

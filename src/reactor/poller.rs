//! Readiness polling over the registered sockets with `poll(2)`.

use crate::reactor::connection::ConnId;

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, nfds_t, poll, pollfd};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// What a socket asks to be woken for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) id: ConnId,
    pub(crate) fd: RawFd,
    /// Set while the connection holds bytes its socket has not taken yet.
    pub(crate) writable: bool,
}

/// Readiness reported for one socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Readiness {
    /// Readable, or in an error/hang-up state a read will surface.
    pub(crate) readable: bool,
    /// Able to take more of the pending output, or failed in a way a write will surface.
    pub(crate) writable: bool,
    /// The descriptor is not open.
    pub(crate) invalid: bool,
}

pub(crate) struct Poller {
    fds: Vec<pollfd>,
    ids: Vec<ConnId>,
}

impl Poller {
    pub(crate) fn new() -> Self {
        Self {
            fds: Vec::new(),
            ids: Vec::new(),
        }
    }

    /// Waits up to `timeout` for any of `interests` to become ready.
    ///
    /// # Arguments
    /// * `interests` - Sockets to watch; every one is watched for reads
    /// * `timeout` - Longest wait when nothing is ready
    ///
    /// # Returns
    /// The ready connections in registry order, or the error `poll` failed with
    pub(crate) fn poll(
        &mut self,
        interests: impl Iterator<Item = Interest>,
        timeout: Duration,
    ) -> io::Result<Vec<(ConnId, Readiness)>> {
        self.fds.clear();
        self.ids.clear();
        for interest in interests {
            let events = if interest.writable {
                POLLIN | POLLOUT
            } else {
                POLLIN
            };
            self.fds.push(pollfd {
                fd: interest.fd,
                events,
                revents: 0,
            });
            self.ids.push(interest.id);
        }

        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let ret = unsafe { poll(self.fds.as_mut_ptr(), self.fds.len() as nfds_t, timeout_ms) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        let ready = self
            .fds
            .iter()
            .zip(&self.ids)
            .filter_map(|(fd, id)| {
                let failed = fd.revents & (POLLERR | POLLHUP) != 0;
                let readiness = Readiness {
                    readable: failed || fd.revents & POLLIN != 0,
                    writable: fd.events & POLLOUT != 0 && (failed || fd.revents & POLLOUT != 0),
                    invalid: fd.revents & POLLNVAL != 0,
                };

                (readiness != Readiness::default()).then_some((*id, readiness))
            })
            .collect();

        Ok(ready)
    }
}

//! The set of live connections.
//!
//! Each entry keeps a connection together with the socket it owns, so the poll set and the
//! connection records can never drift apart: adding or removing an entry does both at once.

use crate::net::socket::Socket;
use crate::reactor::connection::{ConnId, Connection};
use crate::reactor::poller::Interest;
use crate::utils::slab::Slab;

pub(crate) struct Entry<C, R> {
    pub(crate) connection: Connection<C, R>,
    pub(crate) socket: Socket,
}

pub(crate) struct Registry<C, R> {
    entries: Slab<Entry<C, R>>,
}

impl<C, R> Registry<C, R> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Slab::with_capacity(8),
        }
    }

    pub(crate) fn insert(&mut self, connection: Connection<C, R>, socket: Socket) -> ConnId {
        ConnId(self.entries.insert(Entry { connection, socket }))
    }

    pub(crate) fn get(&self, id: ConnId) -> Option<&Entry<C, R>> {
        self.entries.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: ConnId) -> Option<&mut Entry<C, R>> {
        self.entries.get_mut(id.0)
    }

    /// Drops the entry from the poll set and hands it back; its socket is still open.
    pub(crate) fn remove(&mut self, id: ConnId) -> Option<Entry<C, R>> {
        self.entries.remove(id.0)
    }

    /// What to poll for, in registry order.
    pub(crate) fn interests(&self) -> impl Iterator<Item = Interest> {
        self.entries.iter().map(|(key, entry)| Interest {
            id: ConnId(key),
            fd: entry.socket.file_descriptor(),
            writable: !entry.connection.outbound.is_empty(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

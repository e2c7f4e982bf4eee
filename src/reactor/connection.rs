//! Connection records and the snapshot handed to callbacks.

use crate::data::Data;
use crate::net::address::{Address, Protocol};
use crate::protocol::correlation::{Correlation, ReplyIds};
use crate::reactor::core::Reactor;
use crate::reactor::event::Event;
use crate::utils::slab::Key;

use log::warn;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddrV4;
use std::rc::Rc;

/// The callback every event of a connection is delivered to.
pub type Callback<C, R> = Rc<RefCell<dyn FnMut(&mut Reactor<C, R>, &Conn<C, R>, Event, Data)>>;

/// Stable handle to a registered connection.
///
/// Handles are never reused: once a connection is removed its handle stops resolving, even if
/// its slot is taken by a later connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnId(pub(crate) Key);

impl ConnId {
    /// Handle of a connection that never got registered.
    pub const DETACHED: ConnId = ConnId(Key {
        index: usize::MAX,
        generation: u32::MAX,
    });
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DETACHED {
            return f.write_str("#detached");
        }
        write!(f, "#{}.{}", self.0.index, self.0.generation)
    }
}

/// A connection as seen by its callback.
#[derive(Clone, Debug)]
pub struct Conn<C, R> {
    pub id: ConnId,
    pub protocol: Protocol,
    pub remote_address: String,
    pub remote_port: u16,
    pub listening: bool,
    pub context: C,
    /// Only set for [`Event::Reply`]: the value given to the matching request.
    pub reply_context: Option<R>,
}

pub(crate) struct Connection<C, R> {
    pub(crate) protocol: Protocol,
    pub(crate) remote_address: String,
    pub(crate) remote_port: u16,
    pub(crate) listening: bool,
    pub(crate) context: C,
    pub(crate) callback: Callback<C, R>,
    reply_ids: ReplyIds,
    outstanding: HashMap<u16, R>,
    last_request: Option<u16>,
    peer: Option<SocketAddrV4>,
    /// Bytes of a partially received stream frame.
    pub(crate) inbound: Vec<u8>,
    /// Stream bytes the socket has not taken yet, flushed when it turns writable.
    pub(crate) outbound: Vec<u8>,
}

impl<C: Clone, R> Connection<C, R> {
    pub(crate) fn new(
        protocol: Protocol,
        context: C,
        callback: Callback<C, R>,
        listening: bool,
    ) -> Self {
        Self {
            protocol,
            remote_address: String::new(),
            remote_port: 0,
            listening,
            context,
            callback,
            reply_ids: ReplyIds::new(),
            outstanding: HashMap::new(),
            last_request: None,
            peer: None,
            inbound: Vec::new(),
            outbound: Vec::new(),
        }
    }

    pub(crate) fn for_address(
        address: &Address,
        context: C,
        callback: Callback<C, R>,
        listening: bool,
    ) -> Self {
        let mut connection = Self::new(address.protocol(), context, callback, listening);
        connection.remote_address = address.ip().to_owned();
        connection.remote_port = address.port();
        connection
    }

    /// A peer accepted by a listening TCP connection.
    pub(crate) fn accepted(&self, peer: SocketAddrV4) -> Self {
        let mut connection = Self::new(
            self.protocol,
            self.context.clone(),
            Rc::clone(&self.callback),
            false,
        );
        connection.set_peer(peer);
        connection
    }

    pub(crate) fn set_peer(&mut self, peer: SocketAddrV4) {
        self.remote_address = peer.ip().to_string();
        self.remote_port = peer.port();
        self.peer = Some(peer);
    }

    /// Where sends on a listening UDP connection go: the last sender heard from.
    pub(crate) fn peer(&self) -> Option<SocketAddrV4> {
        self.peer
    }

    /// Allocates the id of an outgoing request and remembers its reply context.
    ///
    /// Ids wrap after [`MAX_CORRELATION_ID`](crate::protocol::correlation::MAX_CORRELATION_ID);
    /// reusing an id whose reply is still outstanding replaces the older reply context.
    ///
    /// # Returns
    /// The correlation id to put in the request header
    pub(crate) fn begin_request(&mut self, reply_context: R) -> u16 {
        let id = self.reply_ids.next_id();
        if self.outstanding.insert(id, reply_context).is_some() {
            warn!("request id {id} reused while its reply was still outstanding");
        }
        id
    }

    pub(crate) fn abandon_request(&mut self, id: u16) {
        self.outstanding.remove(&id);
    }

    pub(crate) fn take_request_to_answer(&mut self) -> Option<u16> {
        self.last_request.take()
    }

    /// Makes a received frame current just before its callback runs, so that `reply` answers
    /// the request being delivered and a listening UDP connection answers its sender.
    pub(crate) fn begin_delivery(
        &mut self,
        request_id: Option<u16>,
        sender: Option<SocketAddrV4>,
    ) {
        if let Some(sender) = sender {
            self.set_peer(sender);
        }
        if request_id.is_some() {
            self.last_request = request_id;
        }
    }

    /// Matches an incoming frame's correlation and returns the event it produces.
    pub(crate) fn on_received(&mut self, correlation: Correlation) -> (Event, Option<R>) {
        let reply_context = match correlation {
            Correlation::Reply(id) => {
                let reply_context = self.outstanding.remove(&id);
                if reply_context.is_none() {
                    warn!("reply {id} matches no outstanding request");
                }
                reply_context
            }
            Correlation::OneWay | Correlation::Request(_) => None,
        };

        (correlation.event(), reply_context)
    }

    pub(crate) fn view(&self, id: ConnId, reply_context: Option<R>) -> Conn<C, R> {
        Conn {
            id,
            protocol: self.protocol,
            remote_address: self.remote_address.clone(),
            remote_port: self.remote_port,
            listening: self.listening,
            context: self.context.clone(),
            reply_context,
        }
    }
}

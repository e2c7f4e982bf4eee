use crate::builder::{Config, ReactorBuilder};
use crate::data::Data;
use crate::error::Error;
use crate::net::address::{Address, Protocol};
use crate::net::socket::Socket;
use crate::protocol::correlation::Correlation;
use crate::protocol::framing;
use crate::protocol::header::Header;
use crate::reactor::connection::{Callback, Conn, ConnId, Connection};
use crate::reactor::event::Event;
use crate::reactor::poller::Poller;
use crate::reactor::queue::{DispatchQueue, PendingCallback, Target};
use crate::reactor::registry::{Entry, Registry};
use crate::reactor::send;
use crate::reactor::signal;

use log::{debug, error, info, trace, warn};
use std::cell::{Cell, RefCell};
use std::io;
use std::net::SocketAddrV4;
use std::rc::Rc;
use std::time::Duration;

/// A single-threaded messaging engine.
///
/// The reactor owns every connection and socket. Applications drive it by calling
/// [`tick`](Self::tick) repeatedly; each tick waits for readable sockets, turns what arrived
/// into events, and then delivers all queued events to the connections' callbacks.
///
/// `C` is the per-connection context handed back in every [`Conn`]; `R` is the reply context
/// given to [`request`](Self::request) and returned with the matching [`Event::Reply`].
///
/// # Example
/// ```no_run
/// use msgbox::{Data, Event, Reactor};
/// use std::time::Duration;
///
/// let mut reactor: Reactor = Reactor::new();
/// reactor.listen("udp://*:2468", (), |reactor, conn, event, data| {
///     if event == Event::Message {
///         let mut echo = Data::from_text(&format!("echo:{}", data.as_str()));
///         let _ = reactor.send(conn.id, &mut echo);
///     }
/// });
///
/// loop {
///     reactor.tick(Duration::from_millis(10));
/// }
/// ```
pub struct Reactor<C = (), R = ()> {
    pub(super) registry: Registry<C, R>,
    pub(super) queue: DispatchQueue<PendingCallback<C, R>>,
    pub(super) config: Config,
    poller: Poller,
    draining: Rc<Cell<bool>>,
}

/// Clears the draining flag when a drain ends, including by a panicking callback.
struct DrainGuard(Rc<Cell<bool>>);

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<C: Clone + 'static, R: 'static> Reactor<C, R> {
    pub fn new() -> Self {
        ReactorBuilder::new().build()
    }

    pub(crate) fn with_config(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            queue: DispatchQueue::with_capacity(config.queue_capacity),
            config,
            poller: Poller::new(),
            draining: Rc::new(Cell::new(false)),
        }
    }

    /// Opens a connection to `address` (`tcp://ip:port` or `udp://ip:port`).
    ///
    /// On success the callback later receives [`Event::ConnectionReady`]. On failure it
    /// receives [`Event::Error`] instead and `None` is returned; nothing stays registered.
    ///
    /// # Arguments
    /// * `address` - Where to connect
    /// * `context` - Value handed back in every [`Conn`] of this connection
    /// * `callback` - Receives every event of the connection
    ///
    /// # Returns
    /// The new connection's handle, or `None` if it could not be opened
    pub fn connect<F>(&mut self, address: &str, context: C, callback: F) -> Option<ConnId>
    where
        F: FnMut(&mut Reactor<C, R>, &Conn<C, R>, Event, Data) + 'static,
    {
        self.register(address, context, Rc::new(RefCell::new(callback)), false)
    }

    /// Binds a listening connection to `address`; the ip may be `*` for every interface.
    ///
    /// On success the callback later receives [`Event::Listening`]. Peers accepted on a TCP
    /// listener share its context and callback.
    ///
    /// # Returns
    /// The listener's handle, or `None` if the address is invalid or can't be bound
    pub fn listen<F>(&mut self, address: &str, context: C, callback: F) -> Option<ConnId>
    where
        F: FnMut(&mut Reactor<C, R>, &Conn<C, R>, Event, Data) + 'static,
    {
        self.register(address, context, Rc::new(RefCell::new(callback)), true)
    }

    fn register(
        &mut self,
        address: &str,
        context: C,
        callback: Callback<C, R>,
        listening: bool,
    ) -> Option<ConnId> {
        let address = match Address::parse(address) {
            Ok(address) => address,
            Err(err) => {
                // Never resolved, so only the context and callback are meaningful.
                let connection = Connection::new(Protocol::Udp, context, callback, listening);
                let target = Target::Retired(ConnId::DETACHED, Rc::new(connection));
                self.signal(target, err.into());
                return None;
            }
        };

        let connection = Connection::for_address(&address, context, callback, listening);
        let socket = match self.open_socket(&address, listening) {
            Ok(socket) => socket,
            Err(err) => {
                self.signal(Target::Retired(ConnId::DETACHED, Rc::new(connection)), err);
                return None;
            }
        };

        let id = self.registry.insert(connection, socket);
        let event = if listening {
            info!("connection {id} listening at {address}");
            Event::Listening
        } else {
            info!("connection {id} connected to {address}");
            Event::ConnectionReady
        };
        self.queue.enqueue(PendingCallback::live(id, event, Data::empty()));

        Some(id)
    }

    /// Creates the socket for `address` and connects or binds it.
    ///
    /// # Returns
    /// A non-blocking socket ready to be polled, or the first failing call as an error
    fn open_socket(&self, address: &Address, listening: bool) -> Result<Socket, Error> {
        let socket = Socket::open(address.protocol()).map_err(Error::socket("socket"))?;

        if listening {
            if address.protocol() == Protocol::Tcp {
                socket
                    .set_reuse_address()
                    .map_err(Error::socket("setsockopt"))?;
            }
            socket
                .bind(address.socket_addr())
                .map_err(Error::socket("bind"))?;
            if address.protocol() == Protocol::Tcp {
                socket
                    .listen(self.config.listen_backlog)
                    .map_err(Error::socket("listen"))?;
            }
        } else {
            socket
                .connect(address.socket_addr())
                .map_err(Error::socket("connect"))?;
        }

        socket.set_nonblocking().map_err(Error::socket("fcntl"))?;
        Ok(socket)
    }

    /// Closes a connection. Its callback receives [`Event::ConnectionClosed`] on a later drain.
    pub fn disconnect(&mut self, id: ConnId) -> Result<(), Error> {
        self.unregister(id)
    }

    /// Stops a listening connection. Its callback receives [`Event::ListeningEnded`] on a
    /// later drain.
    pub fn unlisten(&mut self, id: ConnId) -> Result<(), Error> {
        self.unregister(id)
    }

    fn unregister(&mut self, id: ConnId) -> Result<(), Error> {
        let listening = self
            .registry
            .get(id)
            .ok_or(Error::UnknownConnection(id))?
            .connection
            .listening;
        let event = if listening {
            Event::ListeningEnded
        } else {
            Event::ConnectionClosed
        };

        self.retire(id, event);
        Ok(())
    }

    /// Removes a connection and closes its socket.
    ///
    /// Callbacks already queued for the connection keep their place in the queue and are
    /// delivered from the removed record, ahead of anything the caller queues next.
    pub(super) fn remove(&mut self, id: ConnId) -> Option<Rc<Connection<C, R>>> {
        let Entry { connection, socket } = self.registry.remove(id)?;
        drop(socket);
        info!("connection {id} removed");

        let connection = Rc::new(connection);
        for pending in self.queue.iter_mut() {
            if matches!(pending.target, Target::Live(live) if live == id) {
                pending.target = Target::Retired(id, Rc::clone(&connection));
            }
        }

        Some(connection)
    }

    /// Removes a connection and queues its final lifecycle event.
    pub(super) fn retire(&mut self, id: ConnId, event: Event) {
        if let Some(connection) = self.remove(id) {
            self.queue.enqueue(PendingCallback::retired(
                id,
                &connection,
                event,
                Data::empty(),
            ));
        }
    }

    /// Sends a one-way message. `data` keeps its payload and may be reused or dropped.
    ///
    /// Socket failures are delivered as [`Event::Error`] on the connection. On TCP, bytes the
    /// socket can't take yet are buffered and written by later ticks.
    ///
    /// # Returns
    /// `Err(Error::UnknownConnection)` for a stale handle, otherwise `Ok`
    pub fn send(&mut self, id: ConnId, data: &mut Data) -> Result<(), Error> {
        self.transmit(id, data, Header::single(Correlation::OneWay))
            .map(drop)
    }

    /// Sends a request; the answer arrives as [`Event::Reply`] carrying `reply_context`.
    ///
    /// # Arguments
    /// * `id` - Connection to send on
    /// * `data` - Payload; its header region is overwritten
    /// * `reply_context` - Returned with the matching reply
    pub fn request(&mut self, id: ConnId, data: &mut Data, reply_context: R) -> Result<(), Error> {
        let entry = self
            .registry
            .get_mut(id)
            .ok_or(Error::UnknownConnection(id))?;
        let request_id = entry.connection.begin_request(reply_context);
        debug!("connection {id}: request {request_id}");

        let header = Header::single(Correlation::Request(request_id));
        if !self.transmit(id, data, header)?
            && let Some(entry) = self.registry.get_mut(id)
        {
            entry.connection.abandon_request(request_id);
        }

        Ok(())
    }

    /// Answers the most recent request delivered on this connection, once.
    ///
    /// Without one, the connection gets an [`Event::Error`] instead and nothing is sent.
    pub fn reply(&mut self, id: ConnId, data: &mut Data) -> Result<(), Error> {
        let entry = self
            .registry
            .get_mut(id)
            .ok_or(Error::UnknownConnection(id))?;

        match entry.connection.take_request_to_answer() {
            Some(request_id) => self
                .transmit(id, data, Header::single(Correlation::Reply(request_id)))
                .map(drop),
            None => {
                self.report_protocol_error(Target::Live(id), "no request to reply to");
                Ok(())
            }
        }
    }

    /// Writes `header` in front of the payload and sends the frame.
    ///
    /// Stream bytes the socket can't take right away are kept on the connection and flushed
    /// by later ticks.
    ///
    /// # Returns
    /// Whether the frame went out or was buffered; failures have already been signaled
    fn transmit(&mut self, id: ConnId, data: &mut Data, header: Header) -> Result<bool, Error> {
        let max_send_buffer_len = self.config.max_send_buffer_len;
        let entry = self
            .registry
            .get_mut(id)
            .ok_or(Error::UnknownConnection(id))?;
        header.write_into(data);

        let sent = match (entry.connection.protocol, entry.connection.listening) {
            (Protocol::Udp, false) => entry
                .socket
                .send(data.frame())
                .map(drop)
                .map_err(Error::socket("send")),
            (Protocol::Udp, true) => match entry.connection.peer() {
                Some(peer) => entry
                    .socket
                    .send_to(data.frame(), peer)
                    .map(drop)
                    .map_err(Error::socket("sendto")),
                None => Err(Error::protocol(
                    "no peer has sent to this listening connection yet",
                )),
            },
            (Protocol::Tcp, false) => {
                let prefix = framing::length_prefix(data);
                send::write_stream(
                    &entry.socket,
                    &mut entry.connection.outbound,
                    [&prefix, data.frame()],
                    max_send_buffer_len,
                )
            }
            (Protocol::Tcp, true) => Err(Error::protocol(
                "cannot send on a listening tcp connection",
            )),
        };

        match sent {
            Ok(()) => {
                trace!("connection {id}: sent {} bytes", data.len());
                Ok(true)
            }
            Err(err) => {
                self.signal(Target::Live(id), err);
                Ok(false)
            }
        }
    }

    /// Runs one reactor pass: waits up to `timeout` for readable sockets, reads them, then
    /// delivers every event queued before the delivery started.
    ///
    /// Returns the number of callbacks invoked. Events queued by those callbacks wait for the
    /// next tick. Calling `tick` from inside a callback does nothing.
    pub fn tick(&mut self, timeout: Duration) -> usize {
        if self.draining.get() {
            warn!("tick called from inside a callback; ignoring");
            return 0;
        }

        match self.poller.poll(self.registry.interests(), timeout) {
            Ok(ready) => {
                for (id, readiness) in ready {
                    self.on_ready(id, readiness);
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                trace!("poll interrupted: {err}");
            }
            Err(err) => signal::report_internal("poll", err),
        }

        self.drain()
    }

    fn drain(&mut self) -> usize {
        let queued = self.queue.begin_drain();
        trace!("delivering {queued} pending callbacks");
        self.draining.set(true);
        let _draining = DrainGuard(Rc::clone(&self.draining));

        let mut dispatched = 0;
        while let Some(pending) = self.queue.next_delivery() {
            let PendingCallback {
                target,
                event,
                data,
                reply_context,
                request_id,
                sender,
            } = pending;

            let (conn, callback, retired) = match target {
                Target::Live(id) => match self.registry.get_mut(id) {
                    Some(entry) => {
                        let connection = &mut entry.connection;
                        connection.begin_delivery(request_id, sender);
                        (
                            connection.view(id, reply_context),
                            Rc::clone(&connection.callback),
                            None,
                        )
                    }
                    None => {
                        error!("dropping {event} for unregistered connection {id}");
                        continue;
                    }
                },
                Target::Retired(id, connection) => (
                    connection.view(id, reply_context),
                    Rc::clone(&connection.callback),
                    Some(connection),
                ),
            };

            match callback.try_borrow_mut() {
                Ok(mut callback) => {
                    (&mut *callback)(self, &conn, event, data);
                    dispatched += 1;
                }
                Err(_) => error!("callback of connection {} is already running", conn.id),
            }

            drop(retired);
        }

        dispatched
    }

    /// Number of registered connections, listeners and accepted peers included.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.registry.get(id).is_some()
    }

    /// The local address a connection's socket is bound to.
    pub fn local_addr(&self, id: ConnId) -> Result<SocketAddrV4, Error> {
        let entry = self.registry.get(id).ok_or(Error::UnknownConnection(id))?;

        entry
            .socket
            .local_addr()
            .map_err(Error::socket("getsockname"))
    }
}

impl<C: Clone + 'static, R: 'static> Default for Reactor<C, R> {
    fn default() -> Self {
        Self::new()
    }
}

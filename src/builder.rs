//! Fluent builder for Reactor construction.
//!
//! Holds the tunables of a reactor; every one has a default, so
//! `ReactorBuilder::new().build()` is the same as `Reactor::new()`.

use crate::reactor::core::Reactor;

/// Largest datagram, and largest TCP read, accepted in one call.
const DEFAULT_RECV_BUFFER_LEN: usize = 32 * 1024;
/// Largest TCP frame (header plus payload) accepted from a peer.
const DEFAULT_MAX_FRAME_LEN: usize = 8 * 1024 * 1024;
/// Most stream bytes held per connection while its peer is not reading.
const DEFAULT_MAX_SEND_BUFFER_LEN: usize = 16 * 1024 * 1024;
const DEFAULT_LISTEN_BACKLOG: i32 = 128;
const DEFAULT_QUEUE_CAPACITY: usize = 16;

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) recv_buffer_len: usize,
    pub(crate) max_frame_len: usize,
    pub(crate) max_send_buffer_len: usize,
    pub(crate) listen_backlog: i32,
    pub(crate) queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recv_buffer_len: DEFAULT_RECV_BUFFER_LEN,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_send_buffer_len: DEFAULT_MAX_SEND_BUFFER_LEN,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Builder for constructing Reactor instances with fluent API.
///
/// # Example
/// ```
/// use msgbox::{Reactor, ReactorBuilder};
///
/// let reactor: Reactor = ReactorBuilder::new()
///     .recv_buffer_len(64 * 1024)
///     .listen_backlog(16)
///     .build();
/// assert!(reactor.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReactorBuilder {
    config: Config,
}

impl ReactorBuilder {
    /// Creates a builder holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the receive buffer size.
    ///
    /// This is the largest datagram, header included, a UDP connection accepts; larger ones are
    /// dropped and reported as an error event. TCP connections read at most this many bytes per
    /// readiness report.
    ///
    /// # Arguments
    /// * `len` - Buffer size in bytes
    pub fn recv_buffer_len(mut self, len: usize) -> Self {
        self.config.recv_buffer_len = len;
        self
    }

    /// Sets the largest TCP frame a peer may send before the stream is dropped.
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.config.max_frame_len = len;
        self
    }

    /// Sets how many stream bytes a connection may hold for a peer that is not reading.
    ///
    /// A send that would go past the limit is refused with an error event.
    pub fn max_send_buffer_len(mut self, len: usize) -> Self {
        self.config.max_send_buffer_len = len;
        self
    }

    /// Sets the backlog passed to `listen(2)` for TCP listeners.
    ///
    /// # Arguments
    /// * `backlog` - Most connections the kernel queues before they are accepted
    pub fn listen_backlog(mut self, backlog: i32) -> Self {
        self.config.listen_backlog = backlog;
        self
    }

    /// Sets the initial capacity of the pending callback queue.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Builds the reactor.
    ///
    /// # Returns
    /// An empty [`Reactor`] using this configuration
    pub fn build<C: Clone + 'static, R: 'static>(self) -> Reactor<C, R> {
        Reactor::with_config(self.config)
    }
}

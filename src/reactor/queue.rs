//! Pending callbacks waiting for the next drain.
//!
//! A drain moves everything pending into a delivery list and hands items out from there, so
//! callbacks that enqueue more work while the delivery list is being worked through only feed
//! the next drain.

use crate::data::Data;
use crate::reactor::connection::{ConnId, Connection};
use crate::reactor::event::Event;

use std::collections::VecDeque;
use std::mem;
use std::net::SocketAddrV4;
use std::rc::Rc;

/// Who a pending callback is for.
pub(crate) enum Target<C, R> {
    /// A connection still in the registry.
    Live(ConnId),
    /// A connection that was removed, or never registered; it is released once the last
    /// callback referring to it returns.
    Retired(ConnId, Rc<Connection<C, R>>),
}

impl<C, R> Target<C, R> {
    pub(crate) fn id(&self) -> ConnId {
        match self {
            Target::Live(id) | Target::Retired(id, _) => *id,
        }
    }
}

/// One callback invocation waiting to happen.
pub(crate) struct PendingCallback<C, R> {
    pub(crate) target: Target<C, R>,
    pub(crate) event: Event,
    pub(crate) data: Data,
    pub(crate) reply_context: Option<R>,
    /// Id of the request being delivered, if the frame is one.
    pub(crate) request_id: Option<u16>,
    /// Sender of a datagram delivered to a listening UDP connection.
    pub(crate) sender: Option<SocketAddrV4>,
}

impl<C, R> PendingCallback<C, R> {
    pub(crate) fn new(target: Target<C, R>, event: Event, data: Data) -> Self {
        Self {
            target,
            event,
            data,
            reply_context: None,
            request_id: None,
            sender: None,
        }
    }

    pub(crate) fn live(id: ConnId, event: Event, data: Data) -> Self {
        Self::new(Target::Live(id), event, data)
    }

    pub(crate) fn retired(
        id: ConnId,
        connection: &Rc<Connection<C, R>>,
        event: Event,
        data: Data,
    ) -> Self {
        Self::new(Target::Retired(id, Rc::clone(connection)), event, data)
    }

    pub(crate) fn with_reply_context(mut self, reply_context: Option<R>) -> Self {
        self.reply_context = reply_context;
        self
    }

    /// Attaches what a `reply` on this connection should answer once the callback runs.
    ///
    /// # Arguments
    /// * `request_id` - Id of the request carried by the frame, if any
    /// * `sender` - Datagram sender, for listening UDP connections
    pub(crate) fn with_origin(
        mut self,
        request_id: Option<u16>,
        sender: Option<SocketAddrV4>,
    ) -> Self {
        self.request_id = request_id;
        self.sender = sender;
        self
    }
}

/// FIFO of items produced between drains.
///
/// Items sit in `pending` until [`begin_drain`](Self::begin_drain) moves them to `delivering`,
/// from where [`next_delivery`](Self::next_delivery) hands them out one at a time.
pub(crate) struct DispatchQueue<T> {
    pending: Vec<T>,
    delivering: VecDeque<T>,
    capacity: usize,
}

impl<T> DispatchQueue<T> {
    /// Creates an empty queue.
    ///
    /// # Arguments
    /// * `capacity` - Initial capacity of every fresh pending list
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            delivering: VecDeque::new(),
            capacity,
        }
    }

    /// Appends an item for the next drain.
    pub(crate) fn enqueue(&mut self, item: T) {
        self.pending.push(item);
    }

    /// Moves everything enqueued so far behind whatever is still being delivered, and installs
    /// a fresh, empty pending list.
    ///
    /// # Returns
    /// The number of items now waiting for delivery
    pub(crate) fn begin_drain(&mut self) -> usize {
        let pending = mem::replace(&mut self.pending, Vec::with_capacity(self.capacity));
        self.delivering.extend(pending);
        self.delivering.len()
    }

    /// Hands out the next item of the current drain.
    ///
    /// # Returns
    /// Some(item) while the drain lasts, None once it is exhausted
    pub(crate) fn next_delivery(&mut self) -> Option<T> {
        self.delivering.pop_front()
    }

    /// Every queued item, those being delivered first, in delivery order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.delivering.iter_mut().chain(self.pending.iter_mut())
    }

    /// Number of items waiting for the next drain.
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_all<T>(queue: &mut DispatchQueue<T>) -> Vec<T> {
        queue.begin_drain();
        std::iter::from_fn(|| queue.next_delivery()).collect()
    }

    #[test]
    fn delivery_preserves_enqueue_order() {
        let mut queue = DispatchQueue::with_capacity(4);
        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);

        assert_eq!(drain_all(&mut queue), vec![1, 2, 3]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn items_enqueued_while_draining_wait_for_next_drain() {
        let mut queue = DispatchQueue::with_capacity(4);
        queue.enqueue("first");
        queue.enqueue("second");

        assert_eq!(queue.begin_drain(), 2);
        let mut delivered = Vec::new();
        while let Some(item) = queue.next_delivery() {
            delivered.push(item);
            queue.enqueue("produced during drain");
        }

        assert_eq!(delivered, vec!["first", "second"]);
        assert_eq!(
            drain_all(&mut queue),
            vec!["produced during drain", "produced during drain"]
        );
        assert!(drain_all(&mut queue).is_empty());
    }

    #[test]
    fn interrupted_drain_resumes_ahead_of_new_items() {
        let mut queue = DispatchQueue::with_capacity(4);
        queue.enqueue("a");
        queue.enqueue("b");

        queue.begin_drain();
        assert_eq!(queue.next_delivery(), Some("a"));
        queue.enqueue("c");

        assert_eq!(drain_all(&mut queue), vec!["b", "c"]);
    }

    #[test]
    fn iter_mut_visits_delivering_then_pending() {
        let mut queue = DispatchQueue::with_capacity(4);
        queue.enqueue(1);
        queue.begin_drain();
        queue.enqueue(2);

        for item in queue.iter_mut() {
            *item *= 10;
        }

        assert_eq!(drain_all(&mut queue), vec![10, 20]);
    }
}

//! Event-driven messaging reactor.
//!
//! This module turns socket readiness into ordered callback invocations:
//! - [`core`]: the reactor and its public operations
//! - [`connection`]: connection records, handles and the callback-facing snapshot
//! - [`event`]: the event kinds delivered to callbacks
//! - `registry`: live connections together with the sockets they own
//! - `poller`: `poll(2)` readiness polling
//! - `queue`: pending callbacks and the two-phase drain
//! - `receive`: reading datagrams, stream frames and accepting peers
//! - `send`: buffered stream writes flushed on writability
//! - `signal`: turning failures into error events

pub mod connection;
pub mod core;
pub mod event;
pub(crate) mod poller;
pub(crate) mod queue;
mod receive;
mod send;
pub(crate) mod registry;
pub(crate) mod signal;

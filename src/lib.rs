//! Minimal event-driven messaging over UDP and TCP.
//!
//! Applications register connections on a [`Reactor`] with a single callback each, then call
//! [`Reactor::tick`] in a loop. Every tick polls the sockets, reads what arrived, and delivers
//! the resulting [`Event`]s to the callbacks, which may send, disconnect or open new
//! connections without disturbing the delivery in progress.
//!
//! # Architecture
//!
//! - **Reactor**: owns connections and sockets, polls for readiness, drains the event queue
//! - **Data**: payload buffer with hidden space for the wire header, so sends never copy
//! - **Address**: `tcp://ip:port` / `udp://ip:port` parsing
//! - **Header**: the 8-byte frame header carrying request/reply correlation
//! - **ReactorBuilder**: fluent configuration of buffer sizes and limits
//!
//! # Example
//!
//! ```no_run
//! use msgbox::{Data, Event, Reactor};
//! use std::time::Duration;
//!
//! let mut reactor: Reactor = Reactor::new();
//! reactor.connect("udp://127.0.0.1:2468", (), |reactor, conn, event, data| match event {
//!     Event::ConnectionReady => {
//!         let _ = reactor.send(conn.id, &mut Data::from_text("xxx"));
//!     }
//!     Event::Message => println!("got {}", data.as_str()),
//!     _ => {}
//! });
//!
//! for _ in 0..100 {
//!     reactor.tick(Duration::from_millis(10));
//! }
//! ```

mod builder;
pub mod data;
pub mod error;
pub mod net;
pub mod protocol;
pub mod reactor;
pub mod utils;

pub use builder::ReactorBuilder;
pub use data::{Data, HEADER_LEN};
pub use error::Error;
pub use net::address::{Address, AddressError, Protocol};
pub use protocol::correlation::{Correlation, ReplyIds};
pub use protocol::header::Header;
pub use reactor::connection::{Callback, Conn, ConnId};
pub use reactor::core::Reactor;
pub use reactor::event::Event;
pub use utils::bytes::bytes_to_string;

//! Wire protocol.
//!
//! - [`header`]: the fixed 8-byte header carried by every frame
//! - [`correlation`]: request/reply ids packed into the header's `reply_id` field
//! - `framing`: datagram and stream framing on top of sockets

pub mod correlation;
pub(crate) mod framing;
pub mod header;

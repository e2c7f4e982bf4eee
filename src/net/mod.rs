//! IPv4 networking primitives.
//!
//! - [`address`]: parsing of `tcp://` and `udp://` address strings
//! - `socket`: owned socket handle over raw `libc` calls

pub mod address;
pub(crate) mod socket;

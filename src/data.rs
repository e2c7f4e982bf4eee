//! Payload buffers with reserved header space.
//!
//! A [`Data`] owns one allocation laid out as `[header region | payload]`. Users only ever see
//! the payload; the engine writes the wire header into the region in front of it, so sending
//! never copies the payload into a second buffer. Received frames are kept the same way, with
//! the header that arrived on the wire still in place.

use std::borrow::Cow;
use std::fmt;

/// Size of the hidden header region. Only the first six bytes carry meaning; the rest keeps
/// the payload 8-byte aligned relative to the allocation start.
pub const HEADER_LEN: usize = 8;

/// A length-prefixed byte payload.
///
/// Dropping a `Data` releases the whole allocation, header region included.
#[derive(Clone, PartialEq, Eq)]
pub struct Data {
    frame: Vec<u8>,
}

impl Data {
    /// Allocates a zeroed payload of `len` visible bytes.
    pub fn with_len(len: usize) -> Self {
        Self {
            frame: vec![0; HEADER_LEN + len],
        }
    }

    /// Copies `text` into a new payload followed by a NUL terminator.
    pub fn from_text(text: &str) -> Self {
        let mut data = Self::with_len(text.len() + 1);
        data.as_bytes_mut()[..text.len()].copy_from_slice(text.as_bytes());
        data
    }

    /// A payload with no visible bytes, used by lifecycle events.
    pub fn empty() -> Self {
        Self::with_len(0)
    }

    /// Wraps a received frame whose first [`HEADER_LEN`] bytes are the wire header.
    pub(crate) fn from_frame(frame: Vec<u8>) -> Self {
        debug_assert!(frame.len() >= HEADER_LEN);
        Self { frame }
    }

    /// Returns the payload length.
    ///
    /// # Returns
    /// Visible bytes only; the header region is not counted
    pub fn len(&self) -> usize {
        self.frame.len() - HEADER_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the payload.
    ///
    /// # Returns
    /// The bytes after the header region, NUL terminator included for text payloads
    pub fn as_bytes(&self) -> &[u8] {
        &self.frame[HEADER_LEN..]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.frame[HEADER_LEN..]
    }

    /// The payload as text, up to the first NUL byte.
    pub fn as_str(&self) -> Cow<'_, str> {
        let bytes = self.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());

        String::from_utf8_lossy(&bytes[..end])
    }

    #[cfg(test)]
    pub(crate) fn header_region(&self) -> &[u8] {
        &self.frame[..HEADER_LEN]
    }

    pub(crate) fn header_region_mut(&mut self) -> &mut [u8] {
        &mut self.frame[..HEADER_LEN]
    }

    /// Header region and payload together, as they travel on the wire.
    pub(crate) fn frame(&self) -> &[u8] {
        &self.frame
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("len", &self.len())
            .field("bytes", &self.as_str())
            .finish()
    }
}

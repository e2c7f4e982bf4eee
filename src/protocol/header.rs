//! The fixed header in front of every payload.
//!
//! Three big-endian `u16` fields: `reply_id`, `num_packets`, `packet_id`, padded with two
//! zero bytes to [`HEADER_LEN`].

use crate::data::{Data, HEADER_LEN};
use crate::error::Error;
use crate::protocol::correlation::Correlation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    correlation: Correlation,
    num_packets: u16,
    packet_id: u16,
}

impl Header {
    /// Creates a header.
    ///
    /// # Arguments
    /// * `correlation` - One-way, request or reply, with its id
    /// * `num_packets` - Packets making up the message
    /// * `packet_id` - Index of this packet within the message
    pub fn new(correlation: Correlation, num_packets: u16, packet_id: u16) -> Self {
        Self {
            correlation,
            num_packets,
            packet_id,
        }
    }

    /// Header of a message that fits in one packet.
    pub fn single(correlation: Correlation) -> Self {
        Self::new(correlation, 1, 0)
    }

    pub fn correlation(&self) -> Correlation {
        self.correlation
    }

    pub fn correlation_id(&self) -> u16 {
        self.correlation.id()
    }

    pub fn is_reply(&self) -> bool {
        self.correlation.is_reply()
    }

    pub fn num_packets(&self) -> u16 {
        self.num_packets
    }

    pub fn packet_id(&self) -> u16 {
        self.packet_id
    }

    pub fn is_single_packet(&self) -> bool {
        self.num_packets == 1
    }

    /// Encodes the header in wire order.
    ///
    /// # Returns
    /// Big-endian `reply_id`, `num_packets` and `packet_id`, then two reserved zero bytes
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..2].copy_from_slice(&self.correlation.to_wire().to_be_bytes());
        bytes[2..4].copy_from_slice(&self.num_packets.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.packet_id.to_be_bytes());
        bytes
    }

    /// Writes the header into the hidden region in front of `data`'s payload.
    pub fn write_into(&self, data: &mut Data) {
        data.header_region_mut().copy_from_slice(&self.encode());
    }

    /// Decodes and validates the header at the start of `bytes`.
    ///
    /// # Arguments
    /// * `bytes` - A frame, or at least its first [`HEADER_LEN`] bytes
    ///
    /// # Returns
    /// The header, or a protocol error when `bytes` is too short or the fields are invalid
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::protocol(format!(
                "frame of {} bytes is shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }

        let field = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);
        let correlation = Correlation::from_wire(field(0));
        let num_packets = field(2);
        let packet_id = field(4);

        if correlation == Correlation::Reply(0) {
            return Err(Error::protocol("reply without a correlation id"));
        }
        if num_packets == 0 {
            return Err(Error::protocol("header announces zero packets"));
        }

        Ok(Self {
            correlation,
            num_packets,
            packet_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_big_endian() {
        let header = Header::new(Correlation::Request(0x0102), 3, 0x0a0b);
        assert_eq!(header.encode(), [0x01, 0x02, 0x00, 0x03, 0x0a, 0x0b, 0, 0]);
    }

    #[test]
    fn reply_header_parses_back_as_reply() {
        let header = Header::single(Correlation::Reply(42));
        let parsed = Header::decode(&header.encode()).unwrap();

        assert!(parsed.is_reply());
        assert_eq!(parsed.correlation_id(), 42);
        assert!(parsed.is_single_packet());
    }

    #[test]
    fn write_into_leaves_payload_untouched() {
        let mut data = Data::from_text("payload");
        Header::single(Correlation::Request(7)).write_into(&mut data);

        assert_eq!(data.as_str(), "payload");
        assert_eq!(&data.header_region()[..2], &[0, 7]);
    }

    #[test]
    fn short_frames_are_rejected() {
        assert!(matches!(Header::decode(&[0, 0, 0]), Err(Error::Protocol(_))));
    }

    #[test]
    fn malformed_fields_are_rejected() {
        let reply_zero = [0x80, 0, 0, 1, 0, 0, 0, 0];
        assert!(matches!(Header::decode(&reply_zero), Err(Error::Protocol(_))));

        let zero_packets = [0, 1, 0, 0, 0, 0, 0, 0];
        assert!(matches!(Header::decode(&zero_packets), Err(Error::Protocol(_))));
    }
}

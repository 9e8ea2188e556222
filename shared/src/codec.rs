//! Wire encoding for packets.
//!
//! The binary path is the one used at tick rate; the JSON variants exist
//! for debugging and tooling only and must never carry live traffic.

use crate::Packet;

/// Encodes a packet into its compact binary representation.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(packet)
}

/// Decodes a packet from bytes produced by [`encode`].
///
/// Malformed or truncated input yields an error value; callers discard the
/// datagram and wait for the next snapshot to self-heal.
pub fn decode(bytes: &[u8]) -> Result<Packet, bincode::Error> {
    bincode::deserialize(bytes)
}

/// Human-readable text encoding, for logs and debugging.
pub fn encode_debug(packet: &Packet) -> Result<String, serde_json::Error> {
    serde_json::to_string(packet)
}

/// Counterpart of [`encode_debug`].
pub fn decode_debug(text: &str) -> Result<Packet, serde_json::Error> {
    serde_json::from_str(text)
}

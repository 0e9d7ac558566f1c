//! Message encoding and decoding with framing.
//!
//! Provides length-prefixed encoding for reliable delivery over QUIC streams.

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_MAGIC, PROTOCOL_VERSION};
use anyhow::{Context, Result};
use blake3::Hash;
use golemworks_core::MachineReference;

/// Compute schema hash from protocol definitions.
///
/// This hash is used to ensure client and server have compatible protocol versions.
pub fn compute_schema_hash() -> u64 {
    // Hash the serialized message type definitions
    let mut hasher = blake3::Hasher::new();

    // Include protocol version
    hasher.update(&PROTOCOL_VERSION.to_le_bytes());

    // Include protocol magic
    hasher.update(PROTOCOL_MAGIC);

    // Include message type names (deterministic)
    hasher.update(b"ClientMessage");
    hasher.update(b"ServerMessage");
    hasher.update(b"MachineReference");
    hasher.update(b"GolemSnapshot");

    let hash: Hash = hasher.finalize();
    u64::from_le_bytes(hash.as_bytes()[0..8].try_into().unwrap())
}

/// Encode a machine reference using its own fixed binary layout.
///
/// The patch channel carries exactly one such value with no framing of its
/// own; identifier fields, both facing enums, and the optional name string
/// are all part of the layout.
pub fn encode_machine_reference(reference: &MachineReference) -> Result<Vec<u8>> {
    postcard::to_allocvec(reference).context("Failed to serialize machine reference")
}

/// Decode a machine reference from its fixed binary layout.
///
/// Never partially decodes: truncated or malformed input is an error.
pub fn decode_machine_reference(data: &[u8]) -> Result<MachineReference> {
    postcard::from_bytes(data).context("Failed to deserialize machine reference")
}

/// Encode a client message with length prefix.
///
/// Frame format: [length: u32][message_type: u8][payload: bytes]
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(msg).context("Failed to serialize client message")?;
    Ok(build_frame(client_message_type_tag(msg), &payload))
}

/// Encode a server message with length prefix.
///
/// Frame format: [length: u32][message_type: u8][payload: bytes]
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(msg).context("Failed to serialize server message")?;
    Ok(build_frame(server_message_type_tag(msg), &payload))
}

/// Decode a client message from frame data.
///
/// Expects data to start with length prefix.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage> {
    let payload = frame_payload(data)?;
    postcard::from_bytes(payload).context("Failed to deserialize client message")
}

/// Decode a server message from frame data.
///
/// Expects data to start with length prefix.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage> {
    let payload = frame_payload(data)?;
    postcard::from_bytes(payload).context("Failed to deserialize server message")
}

fn build_frame(type_tag: u8, payload: &[u8]) -> Vec<u8> {
    // Build frame: length + message type + payload
    let mut frame = Vec::with_capacity(4 + 1 + payload.len());

    // Length (excluding length field itself)
    let length = (1 + payload.len()) as u32;
    frame.extend_from_slice(&length.to_le_bytes());

    // Message type tag (for multiplexing if needed)
    frame.push(type_tag);

    // Payload
    frame.extend_from_slice(payload);

    frame
}

fn frame_payload(data: &[u8]) -> Result<&[u8]> {
    if data.len() < 5 {
        return Err(anyhow::anyhow!(
            "Frame too short: {} bytes (minimum 5)",
            data.len()
        ));
    }

    // Read length
    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

    if data.len() < 4 + length {
        return Err(anyhow::anyhow!(
            "Incomplete frame: expected {} bytes, got {}",
            4 + length,
            data.len()
        ));
    }

    // Skip message type tag (data[4])
    Ok(&data[5..4 + length])
}

/// Get message type tag for client messages.
fn client_message_type_tag(msg: &ClientMessage) -> u8 {
    match msg {
        ClientMessage::Handshake { .. } => 0,
        ClientMessage::SetManagedMachine(_) => 1,
        ClientMessage::OpenMenu => 2,
        ClientMessage::CloseMenu => 3,
        ClientMessage::Disconnect { .. } => 4,
    }
}

/// Get message type tag for server messages.
fn server_message_type_tag(msg: &ServerMessage) -> u8 {
    match msg {
        ServerMessage::HandshakeResponse { .. } => 0,
        ServerMessage::HeldItemSync { .. } => 1,
        ServerMessage::MenuChanged { .. } => 2,
        ServerMessage::Disconnect { .. } => 3,
    }
}

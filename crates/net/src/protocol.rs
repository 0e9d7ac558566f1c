//! Protocol message definitions for client-server communication.
//!
//! All messages use postcard serialization for compact binary encoding.

use golemworks_core::{ItemStack, MachineReference, PlayerId};
use serde::{Deserialize, Serialize};

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u16 = 1;

/// Protocol magic bytes to identify the golemworks protocol.
pub const PROTOCOL_MAGIC: &[u8; 10] = b"GWRK\x00\x01\x00\x00\x00\x00";

/// Maximum length of a machine reference custom name (bytes).
pub const MAX_CUSTOM_NAME_LEN: usize = 64;

/// Maximum length of a golem display name in a synced snapshot (bytes).
pub const MAX_GOLEM_NAME_LEN: usize = 64;

/// Maximum length of a disconnect/rejection reason (bytes).
pub const MAX_REASON_LEN: usize = 256;

/// Number of hotbar slots a held-item sync may address.
pub const MAX_HOTBAR_SLOTS: u8 = 9;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMessage {
    /// Handshake request with protocol version and schema hash.
    Handshake {
        /// Protocol version.
        version: u16,
        /// Schema hash for compatibility.
        schema_hash: u64,
    },

    /// Patch the managed machine link of the golem bound to the held sigil.
    ///
    /// Carries a full [`MachineReference`] but only the holder-editable
    /// fields are honored; the identifier fields are ignored by the
    /// authority. Consumed once on receipt, never persisted.
    SetManagedMachine(MachineReference),

    /// The player opened the sigil's interaction surface.
    OpenMenu,

    /// The player closed the sigil's interaction surface.
    CloseMenu,

    /// Client disconnect notification.
    Disconnect {
        /// Reason for disconnect.
        reason: String,
    },
}

impl ClientMessage {
    /// Verify message limits and validity.
    ///
    /// This should be called on all received messages to prevent DoS attacks.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            ClientMessage::SetManagedMachine(reference) => {
                verify_reference(reference)?;
            }
            ClientMessage::Disconnect { reason } => {
                if reason.len() > MAX_REASON_LEN {
                    return Err("Disconnect reason too long");
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Handshake response accepting or rejecting connection.
    HandshakeResponse {
        /// Whether handshake was accepted.
        accepted: bool,
        /// Reason for rejection (if not accepted).
        reason: Option<String>,
        /// Assigned player ID.
        player_id: Option<PlayerId>,
    },

    /// Full overwrite of one held-item slot from authoritative state.
    ///
    /// This is the only path by which a client copy learns an authoritative
    /// machine identifier; the slot's previous contents are replaced, never
    /// merged.
    HeldItemSync {
        /// Hotbar slot index.
        slot: u8,
        /// New slot contents (None clears the slot).
        stack: Option<ItemStack>,
    },

    /// The player's open interaction surface changed.
    MenuChanged {
        /// Monotonic revision of the menu contents.
        revision: u64,
    },

    /// Server disconnect notification.
    Disconnect {
        /// Reason for disconnect.
        reason: String,
    },
}

impl ServerMessage {
    /// Verify message limits and validity.
    ///
    /// This should be called on all received messages to prevent DoS attacks.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            ServerMessage::HandshakeResponse {
                reason: Some(r), ..
            } => {
                if r.len() > MAX_REASON_LEN {
                    return Err("Handshake rejection reason too long");
                }
            }
            ServerMessage::HeldItemSync { slot, stack } => {
                if *slot >= MAX_HOTBAR_SLOTS {
                    return Err("Held item slot out of range");
                }
                if let Some(stack) = stack {
                    verify_stack(stack)?;
                }
            }
            ServerMessage::Disconnect { reason } => {
                if reason.len() > MAX_REASON_LEN {
                    return Err("Disconnect reason too long");
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn verify_reference(reference: &MachineReference) -> Result<(), &'static str> {
    if let Some(name) = &reference.custom_name {
        if name.len() > MAX_CUSTOM_NAME_LEN {
            return Err("Machine custom name too long");
        }
    }
    Ok(())
}

fn verify_stack(stack: &ItemStack) -> Result<(), &'static str> {
    if let Some(binding) = stack.golem_binding() {
        if binding.snapshot.name.len() > MAX_GOLEM_NAME_LEN {
            return Err("Golem name too long");
        }
        if let Some(reference) = &binding.snapshot.managed_machine {
            verify_reference(reference)?;
        }
    }
    Ok(())
}

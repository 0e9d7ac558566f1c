#![warn(missing_docs)]
//! Networking abstractions shared by the client/server.

mod channel;
mod codec;
mod connection;
mod protocol;
mod transport;

pub use channel::{ChannelManager, ChannelType};
pub use codec::{
    compute_schema_hash, decode_client_message, decode_machine_reference, decode_server_message,
    encode_client_message, encode_machine_reference, encode_server_message,
};
pub use connection::{ClientConnection, ServerConnection};
pub use protocol::{
    ClientMessage, ServerMessage, MAX_CUSTOM_NAME_LEN, MAX_GOLEM_NAME_LEN, MAX_HOTBAR_SLOTS,
    MAX_REASON_LEN, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
pub use transport::{ClientEndpoint, ServerEndpoint};

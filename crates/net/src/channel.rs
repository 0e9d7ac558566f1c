//! Channel multiplexing for different message types over QUIC.
//!
//! Every channel is reliable-ordered; each message travels on its own
//! unidirectional stream with a channel-tag and length header.

use anyhow::{Context, Result};
use quinn::Connection;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Channel type identifier for message routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelType {
    /// Commands from client to server (patches, menu open/close).
    Command = 0,
    /// Authoritative state pushed from server to client.
    StateSync = 1,
    /// Diagnostics and debug info.
    Diagnostics = 2,
}

impl TryFrom<u8> for ChannelType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ChannelType::Command),
            1 => Ok(ChannelType::StateSync),
            2 => Ok(ChannelType::Diagnostics),
            _ => Err(anyhow::anyhow!("Invalid channel type: {}", value)),
        }
    }
}

/// Multiplexed channel manager for QUIC connections.
pub struct ChannelManager {
    connection: Connection,
}

impl ChannelManager {
    /// Create a new channel manager for the given connection.
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Send a message on a channel (QUIC stream).
    ///
    /// Opens a new unidirectional stream for each message.
    pub async fn send(&self, channel: ChannelType, data: &[u8]) -> Result<()> {
        trace!("Sending {} bytes on {:?}", data.len(), channel);

        // Open a new unidirectional stream
        let mut send_stream = self
            .connection
            .open_uni()
            .await
            .context("Failed to open unidirectional stream")?;

        // Write channel type header
        send_stream
            .write_all(&[channel as u8])
            .await
            .context("Failed to write channel type")?;

        // Write length prefix
        let len = data.len() as u32;
        send_stream
            .write_all(&len.to_le_bytes())
            .await
            .context("Failed to write length prefix")?;

        // Write data
        send_stream
            .write_all(data)
            .await
            .context("Failed to write data")?;

        // Finish the stream
        send_stream.finish().context("Failed to finish stream")?;

        trace!("Sent {} bytes on {:?}", data.len(), channel);

        Ok(())
    }

    /// Receive the next message on any channel (QUIC stream).
    ///
    /// Returns the channel type and message data.
    pub async fn recv(&self) -> Result<(ChannelType, Vec<u8>)> {
        // Accept the next unidirectional stream
        let mut recv_stream = self
            .connection
            .accept_uni()
            .await
            .context("Failed to accept unidirectional stream")?;

        // Read channel type header
        let mut channel_byte = [0u8; 1];
        recv_stream
            .read_exact(&mut channel_byte)
            .await
            .context("Failed to read channel type")?;
        let channel = ChannelType::try_from(channel_byte[0])?;

        // Read length prefix
        let mut len_bytes = [0u8; 4];
        recv_stream
            .read_exact(&mut len_bytes)
            .await
            .context("Failed to read length prefix")?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        // Read data
        let mut data = vec![0u8; len];
        recv_stream
            .read_exact(&mut data)
            .await
            .context("Failed to read data")?;

        trace!("Received {} bytes on {:?}", data.len(), channel);

        Ok((channel, data))
    }

    /// Get the remote address of this connection.
    pub fn remote_address(&self) -> std::net::SocketAddr {
        self.connection.remote_address()
    }

    /// Close the connection gracefully.
    pub fn close(&self, reason: &str) {
        self.connection.close(0u32.into(), reason.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ClientEndpoint, ServerEndpoint};

    #[test]
    fn channel_tags_are_stable() {
        assert_eq!(ChannelType::try_from(0).unwrap(), ChannelType::Command);
        assert_eq!(ChannelType::try_from(1).unwrap(), ChannelType::StateSync);
        assert_eq!(ChannelType::try_from(2).unwrap(), ChannelType::Diagnostics);
        assert!(ChannelType::try_from(3).is_err());
    }

    #[tokio::test]
    async fn test_channel_roundtrip() {
        // Start server
        let server =
            ServerEndpoint::bind("127.0.0.1:0".parse().unwrap()).expect("Failed to bind server");
        let server_addr = server.local_addr();

        // Spawn server task
        let server_handle = tokio::spawn(async move {
            let incoming = server.accept().await.expect("No incoming connection");
            let connection = incoming.await.expect("Failed to accept connection");
            let manager = ChannelManager::new(connection);

            // Receive message
            let (channel, data) = manager.recv().await.expect("Failed to receive message");
            assert_eq!(channel, ChannelType::Command);
            assert_eq!(data, b"set managed machine");

            // Send response
            manager
                .send(ChannelType::StateSync, b"held item sync")
                .await
                .expect("Failed to send response");

            // Keep connection alive briefly
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        });

        // Small delay to ensure server is listening
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        // Connect client
        let client = ClientEndpoint::new().expect("Failed to create client");
        let connection = client.connect(server_addr).await.expect("Failed to connect");
        let manager = ChannelManager::new(connection);

        // Send message
        manager
            .send(ChannelType::Command, b"set managed machine")
            .await
            .expect("Failed to send message");

        // Receive response
        let (channel, data) = manager.recv().await.expect("Failed to receive response");
        assert_eq!(channel, ChannelType::StateSync);
        assert_eq!(data, b"held item sync");

        // Wait for server task
        server_handle.await.expect("Server task panicked");
    }
}

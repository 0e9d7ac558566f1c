//! Multiplayer server with network state synchronization.

use crate::state::AuthorityState;
use anyhow::{Context, Result};
use golemworks_core::{MachineCatalog, PlayerId, SimTick};
use golemworks_net::{ServerConnection, ServerEndpoint};
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{debug, info, instrument, warn};

/// Client state tracked by the server.
pub struct ConnectedClient {
    /// Network connection to client.
    connection: ServerConnection,

    /// Player ID assigned to this client.
    player_id: PlayerId,
}

/// Multiplayer server with networking.
pub struct MultiplayerServer {
    /// Authoritative world state.
    state: AuthorityState,
    current_tick: SimTick,

    /// Network transport.
    endpoint: ServerEndpoint,

    /// Connected clients indexed by socket address.
    clients: HashMap<SocketAddr, ConnectedClient>,

    /// Next player ID to assign.
    next_player_id: u64,
}

impl MultiplayerServer {
    /// Create a new multiplayer server bound to the specified address.
    pub fn bind(addr: SocketAddr, catalog: MachineCatalog) -> Result<Self> {
        let endpoint = ServerEndpoint::bind(addr).context("Failed to bind server endpoint")?;

        let local_addr = endpoint.local_addr();
        info!("Multiplayer server bound to {}", local_addr);

        Ok(Self {
            state: AuthorityState::new(catalog),
            current_tick: SimTick::ZERO,
            endpoint,
            clients: HashMap::new(),
            next_player_id: 1,
        })
    }

    /// Run a single simulation tick with network updates.
    ///
    /// Advances the simulation, then drains the state's outbound queue to
    /// the owning connections. Inbound messages are pumped separately via
    /// [`MultiplayerServer::receive_from`].
    #[instrument(skip(self), fields(tick = self.current_tick.0, client_count = self.clients.len()))]
    pub async fn tick(&mut self) -> Result<()> {
        debug!("Running server tick");

        self.state.tick(self.current_tick);

        for (player_id, message) in self.state.take_outbound() {
            let Some(client) = self
                .clients
                .values_mut()
                .find(|client| client.player_id == player_id)
            else {
                debug!(player = player_id.0, "dropping message for disconnected player");
                continue;
            };
            if let Err(e) = client.connection.send(message).await {
                warn!("Failed to send state update: {}", e);
            }
        }

        self.current_tick = self.current_tick.advance(1);
        Ok(())
    }

    /// Accept a new client connection.
    ///
    /// This should be called in a loop to handle incoming connections.
    #[instrument(skip(self))]
    pub async fn accept_client(&mut self) -> Result<()> {
        if let Some(incoming) = self.endpoint.accept().await {
            let addr = incoming.remote_address();
            info!("New connection from {}", addr);

            match incoming.await {
                Ok(quinn_connection) => {
                    self.handle_new_client(addr, quinn_connection).await?;
                }
                Err(e) => {
                    warn!("Failed to establish connection from {}: {}", addr, e);
                }
            }
        }
        Ok(())
    }

    /// Handle a newly connected client.
    #[instrument(skip(self, quinn_connection), fields(addr = %addr))]
    async fn handle_new_client(
        &mut self,
        addr: SocketAddr,
        quinn_connection: quinn::Connection,
    ) -> Result<()> {
        debug!("Processing new client handshake");
        let connection = ServerConnection::new(quinn_connection);

        // Perform handshake
        match connection.accept_handshake().await {
            Ok(_schema_hash) => {
                // Assign player ID
                let player_id = PlayerId(self.next_player_id);
                self.next_player_id += 1;

                connection.accept_handshake_with_player(player_id).await?;

                info!(player_id = player_id.0, "Client authenticated successfully");

                self.state.add_player(player_id);
                self.clients.insert(
                    addr,
                    ConnectedClient {
                        connection,
                        player_id,
                    },
                );
            }
            Err(e) => {
                warn!("Handshake failed for {}: {}", addr, e);
            }
        }

        Ok(())
    }

    /// Await one message from the given client and dispatch it.
    ///
    /// Messages failing [`golemworks_net::ClientMessage::verify`] are
    /// dropped with a warning before they reach the state.
    pub async fn receive_from(&mut self, addr: SocketAddr) -> Result<()> {
        let Some(client) = self.clients.get(&addr) else {
            return Err(anyhow::anyhow!("No connected client at {}", addr));
        };

        let message = client.connection.recv().await?;
        let player_id = client.player_id;

        if let Err(reason) = message.verify() {
            warn!(player = player_id.0, reason, "Dropping invalid message");
            return Ok(());
        }

        self.state.handle_message(player_id, message);
        Ok(())
    }

    /// Drain every message already buffered on connected clients.
    ///
    /// Each client is polled without waiting so the tick cadence is never
    /// blocked on a quiet connection; a receive error drops the client.
    pub async fn pump_inbound(&mut self) {
        let addrs: Vec<SocketAddr> = self.clients.keys().copied().collect();
        for addr in addrs {
            loop {
                let received =
                    tokio::time::timeout(std::time::Duration::ZERO, self.receive_from(addr)).await;
                match received {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => {
                        warn!("Receive failed for {}: {}", addr, e);
                        self.disconnect_client(addr);
                        break;
                    }
                    // Nothing pending this tick.
                    Err(_) => break,
                }
            }
        }
    }

    /// Addresses of all connected clients.
    pub fn client_addrs(&self) -> Vec<SocketAddr> {
        self.clients.keys().copied().collect()
    }

    /// Drop a client, removing its player from the state.
    pub fn disconnect_client(&mut self, addr: SocketAddr) {
        if let Some(client) = self.clients.remove(&addr) {
            self.state.remove_player(client.player_id);
            client.connection.close("Disconnected");
        }
    }

    /// Get current tick.
    pub fn current_tick(&self) -> SimTick {
        self.current_tick
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Get local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Read access to the authoritative state.
    pub fn state(&self) -> &AuthorityState {
        &self.state
    }

    /// Mutable access to the authoritative state.
    pub fn state_mut(&mut self) -> &mut AuthorityState {
        &mut self.state
    }
}

impl ConnectedClient {
    /// Get assigned player ID.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Get reference to connection.
    pub fn connection(&self) -> &ServerConnection {
        &self.connection
    }
}

#![warn(missing_docs)]
//! Authoritative simulation host.

pub mod multiplayer;
pub mod state;

pub use multiplayer::MultiplayerServer;
pub use state::{AuthorityState, LinkError, MenuSession, PlayerState, HOTBAR_SLOTS};

use anyhow::Result;
use golemworks_core::{MachineCatalog, SimTick};

/// Minimal server harness driving the authoritative state without networking.
pub struct Server {
    state: AuthorityState,
    current_tick: SimTick,
}

impl Server {
    /// Create a new server over the given machine catalog.
    pub fn new(catalog: MachineCatalog) -> Self {
        Self {
            state: AuthorityState::new(catalog),
            current_tick: SimTick::ZERO,
        }
    }

    /// Run a single deterministic tick.
    pub fn tick(&mut self) -> Result<()> {
        self.state.tick(self.current_tick);
        self.current_tick = self.current_tick.advance(1);
        Ok(())
    }

    /// Current tick.
    pub fn current_tick(&self) -> SimTick {
        self.current_tick
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_ticks_advance() {
        let mut server = Server::new(MachineCatalog::with_defaults());
        assert_eq!(server.current_tick(), SimTick::ZERO);
        server.tick().unwrap();
        server.tick().unwrap();
        assert_eq!(server.current_tick(), SimTick(2));
    }
}

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, net::SocketAddr, path::Path};
use tracing::warn;

const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the QUIC endpoint binds to.
    pub bind_addr: SocketAddr,
    /// Simulation ticks per second.
    pub tick_rate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4747".parse().expect("valid default address"),
            tick_rate: 20,
        }
    }
}

impl ServerConfig {
    /// Load server configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ServerConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    ServerConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH) {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!(
                        "Server config not found at {}. Using defaults",
                        path.display()
                    );
                }
                ServerConfig::default()
            }
        }
    }

    /// Save server configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Milliseconds per simulation tick.
    pub fn tick_interval_ms(&self) -> u64 {
        1000 / u64::from(self.tick_rate.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.tick_rate, 20);
        assert_eq!(config.tick_interval_ms(), 50);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load_from_path(Path::new("/nonexistent/server.toml"));
        assert_eq!(config.tick_rate, ServerConfig::default().tick_rate);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let path = std::env::temp_dir().join(format!(
            "golemworks-config-{}.toml",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let mut config = ServerConfig::default();
        config.tick_rate = 10;
        config.save_to_path(&path).expect("save");

        let loaded = ServerConfig::load_from_path(&path);
        assert_eq!(loaded.tick_rate, 10);
        assert_eq!(loaded.bind_addr, config.bind_addr);
    }
}

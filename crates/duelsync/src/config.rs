//! Server configuration.

use std::str::FromStr;
use std::time::Duration;

use duelsync_match::{CoordinatorConfig, LobbyConfig};
use duelsync_quickroom::QuickRoomConfig;
use duelsync_relay::RelayConfig;
use duelsync_transport::TransportConfig;

use crate::DuelsyncError;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address for the HTTP API.
    pub http_addr: String,
    /// Address for the realtime relay WebSocket listener.
    pub relay_addr: String,
    /// How often the background sweeper clears expired entries.
    pub sweep_interval: Duration,
    pub coordinator: CoordinatorConfig,
    pub lobby: LobbyConfig,
    pub quick_room: QuickRoomConfig,
    pub relay: RelayConfig,
    pub transport: TransportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            relay_addr: "127.0.0.1:8081".to_string(),
            sweep_interval: Duration::from_secs(60),
            coordinator: CoordinatorConfig::default(),
            lobby: LobbyConfig::default(),
            quick_room: QuickRoomConfig::default(),
            relay: RelayConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `DUELSYNC_*` environment variables.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `DUELSYNC_HTTP_ADDR` | `http_addr` |
    /// | `DUELSYNC_RELAY_ADDR` | `relay_addr` |
    /// | `DUELSYNC_QUICKROOM_TTL_SECS` | `quick_room.absolute_ttl` |
    /// | `DUELSYNC_QUICKROOM_IDLE_SECS` | `quick_room.idle_ttl` |
    /// | `DUELSYNC_LOBBY_TTL_SECS` | `lobby.ttl` |
    pub fn from_env() -> Result<Self, DuelsyncError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DuelsyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(addr) = lookup("DUELSYNC_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(addr) = lookup("DUELSYNC_RELAY_ADDR") {
            config.relay_addr = addr;
        }
        if let Some(secs) = parse(&lookup, "DUELSYNC_QUICKROOM_TTL_SECS")? {
            config.quick_room.absolute_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "DUELSYNC_QUICKROOM_IDLE_SECS")? {
            config.quick_room.idle_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "DUELSYNC_LOBBY_TTL_SECS")? {
            config.lobby.ttl = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, DuelsyncError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e| {
                DuelsyncError::Config(format!("{key}={raw:?}: {e}"))
            })
        })
        .transpose()
}

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use common::config::{FileContentConfigProvider, Validate};
use common::games::snake::{WorldSettings, DEFAULT_TICK_MILLIS, DEFAULT_WORLD_COLS, DEFAULT_WORLD_ROWS};
use common::leaderboard::{LeaderboardGateway, LeaderboardStore, MemoryLeaderboardStore, YamlFileLeaderboardStore};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_LEADERBOARD_KEY: &str = "snake:leaderboard";
pub const DEFAULT_LEADERBOARD_FILE: &str = "leaderboard.yaml";
pub const WEBSOCKET_PATH: &str = "/ws/game";
pub const MAX_TEXT_FRAME_BYTES: usize = 64 * 1024;
pub const OUTBOUND_QUEUE_CAPACITY: usize = 128;
pub const LEADERBOARD_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub world: WorldConfig,
    pub tick_millis: u64,
    pub leaderboard: LeaderboardConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub cols: i32,
    pub rows: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardBackend {
    Memory,
    File,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub key: String,
    pub backend: LeaderboardBackend,
    pub file_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            world: WorldConfig::default(),
            tick_millis: DEFAULT_TICK_MILLIS,
            leaderboard: LeaderboardConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cols: DEFAULT_WORLD_COLS,
            rows: DEFAULT_WORLD_ROWS,
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_LEADERBOARD_KEY.to_string(),
            backend: LeaderboardBackend::Memory,
            file_path: DEFAULT_LEADERBOARD_FILE.to_string(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.bind_address.trim().is_empty() {
            return Err("Bind address must not be empty".to_string());
        }
        if self.leaderboard.key.trim().is_empty() {
            return Err("Leaderboard key must not be empty".to_string());
        }
        if self.leaderboard.backend == LeaderboardBackend::File && self.leaderboard.file_path.trim().is_empty() {
            return Err("Leaderboard file path must not be empty for the file backend".to_string());
        }
        Ok(())
    }
}

impl ServerConfig {
    /// World dimensions and cadence, clamped to the playable minimums.
    pub fn world_settings(&self) -> WorldSettings {
        WorldSettings::clamped(self.world.cols, self.world.rows, self.tick_millis)
    }
}

impl LeaderboardConfig {
    pub fn open_gateway(&self) -> Result<LeaderboardGateway, String> {
        let store: Arc<dyn LeaderboardStore> = match self.backend {
            LeaderboardBackend::Memory => Arc::new(MemoryLeaderboardStore::new()),
            LeaderboardBackend::File => Arc::new(YamlFileLeaderboardStore::open(
                FileContentConfigProvider::new(self.file_path.clone()),
            )?),
        };
        Ok(LeaderboardGateway::new(store, self.key.clone()))
    }
}

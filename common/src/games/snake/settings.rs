use std::time::Duration;

use super::types::FieldSize;

pub const DEFAULT_WORLD_COLS: i32 = 120;
pub const DEFAULT_WORLD_ROWS: i32 = 120;
pub const MIN_WORLD_SIZE: i32 = 40;
pub const DEFAULT_TICK_MILLIS: u64 = 120;
pub const MIN_TICK_MILLIS: u64 = 80;
pub const FOOD_TARGET: usize = 60;
pub const INITIAL_SNAKE_LENGTH: usize = 6;
pub const RESPAWN_DELAY_TICKS: u64 = 15;
pub const FOOD_REWARD: u32 = 10;
/// Distance from each edge kept free when picking a spawn head.
pub const SPAWN_MARGIN: i32 = 10;
pub const MAX_NAME_LENGTH: usize = 32;
pub const DEFAULT_PLAYER_NAME: &str = "Player";

pub const COLORS: [&str; 10] = [
    "#4CAF50", "#FF7043", "#9575CD", "#26C6DA", "#EC407A",
    "#FFCA28", "#66BB6A", "#8D6E63", "#42A5F5", "#AB47BC",
];

#[derive(Clone, Debug, PartialEq)]
pub struct WorldSettings {
    pub field_size: FieldSize,
    pub tick_interval: Duration,
    pub food_target: usize,
    pub initial_length: usize,
    pub respawn_delay: u64,
    pub food_reward: u32,
}

impl WorldSettings {
    /// Builds settings from raw configured values, clamping the world to at
    /// least `MIN_WORLD_SIZE` cells per side and the tick to `MIN_TICK_MILLIS`.
    pub fn clamped(cols: i32, rows: i32, tick_millis: u64) -> Self {
        Self {
            field_size: FieldSize {
                cols: cols.max(MIN_WORLD_SIZE),
                rows: rows.max(MIN_WORLD_SIZE),
            },
            tick_interval: Duration::from_millis(tick_millis.max(MIN_TICK_MILLIS)),
            food_target: FOOD_TARGET,
            initial_length: INITIAL_SNAKE_LENGTH,
            respawn_delay: RESPAWN_DELAY_TICKS,
            food_reward: FOOD_REWARD,
        }
    }

    pub fn tick_millis(&self) -> u64 {
        self.tick_interval.as_millis() as u64
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self::clamped(DEFAULT_WORLD_COLS, DEFAULT_WORLD_ROWS, DEFAULT_TICK_MILLIS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WorldSettings::default();
        assert_eq!(settings.field_size, FieldSize { cols: 120, rows: 120 });
        assert_eq!(settings.tick_millis(), 120);
        assert_eq!(settings.food_target, 60);
    }

    #[test]
    fn test_small_values_are_clamped() {
        let settings = WorldSettings::clamped(10, -5, 20);
        assert_eq!(settings.field_size, FieldSize { cols: 40, rows: 40 });
        assert_eq!(settings.tick_millis(), 80);
    }

    #[test]
    fn test_large_values_pass_through() {
        let settings = WorldSettings::clamped(200, 64, 250);
        assert_eq!(settings.field_size, FieldSize { cols: 200, rows: 64 });
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
    }
}

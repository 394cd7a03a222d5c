pub mod config;
pub mod games;
pub mod identifiers;
pub mod leaderboard;
pub mod logger;
pub mod protocol;

pub use identifiers::*;

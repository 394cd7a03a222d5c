mod food;
mod game_state;
mod player;
mod session;
mod settings;
mod types;

pub use food::FoodPool;
pub use game_state::{JoinOutcome, ScoreUpdate, TickOutcome, World};
pub use player::PlayerState;
pub use session::PlayerSession;
pub use settings::*;
pub use types::{DeathReason, Direction, FieldSize, Point};

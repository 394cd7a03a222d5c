use common::games::snake::{Point, World};
use common::protocol::{LeaderboardEntry, PlayerPayload, StateMessage};

/// World state copied out under the lock, completed with the leaderboard
/// once the lock is released.
#[derive(Clone, Debug)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub players: Vec<PlayerPayload>,
    pub foods: Vec<Point>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        let players = world
            .players()
            .map(|player| PlayerPayload {
                id: player.id.to_string(),
                name: player.name.clone(),
                color: player.color.to_string(),
                alive: player.alive,
                score: player.score,
                segments: if player.alive {
                    player.body.iter().copied().collect()
                } else {
                    Vec::new()
                },
            })
            .collect();

        let mut foods: Vec<Point> = world.food().iter().copied().collect();
        foods.sort();

        Self {
            tick: world.tick_index(),
            players,
            foods,
        }
    }

    pub fn into_message(self, leaderboard: Vec<LeaderboardEntry>) -> StateMessage {
        StateMessage {
            tick: self.tick,
            players: self.players,
            foods: self.foods,
            leaderboard,
        }
    }
}

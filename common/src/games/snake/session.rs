use crate::ConnectionId;
use super::player::PlayerState;
use super::types::Direction;

/// Server-side state bound to one connection. `player` stays `None` until
/// the first join.
#[derive(Clone, Debug)]
pub struct PlayerSession {
    pub connection_id: ConnectionId,
    pub player: Option<PlayerState>,
    pub pending_direction: Option<Direction>,
    pub last_direction: Option<Direction>,
    pub respawn_at: u64,
}

impl PlayerSession {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            player: None,
            pending_direction: None,
            last_direction: None,
            respawn_at: 0,
        }
    }

    pub fn reset_direction(&mut self) {
        self.pending_direction = Some(Direction::Right);
        self.last_direction = Some(Direction::Right);
    }

    /// Records a requested turn. Reversing onto the neck is refused.
    pub fn request_direction(&mut self, direction: Direction) -> bool {
        if let Some(last) = self.last_direction
            && direction.is_opposite(&last)
        {
            return false;
        }
        self.pending_direction = Some(direction);
        true
    }

    /// Direction for the upcoming move; consumes the pending request.
    pub fn take_effective_direction(&mut self) -> Direction {
        self.pending_direction
            .take()
            .or(self.last_direction)
            .unwrap_or(Direction::Right)
    }

    pub fn is_respawn_due(&self, tick: u64) -> bool {
        matches!(&self.player, Some(player) if !player.alive) && self.respawn_at <= tick
    }
}

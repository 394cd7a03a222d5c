use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use common::games::snake::{Direction, JoinOutcome, World};
use common::leaderboard::{LeaderboardGateway, LEADERBOARD_SIZE};
use common::protocol::{encode_server_json, ServerMessage, StateMessage, WelcomeMessage};
use common::{log, ConnectionId};

use crate::broadcaster::{Broadcaster, ClientHandle};
use crate::snapshot::WorldSnapshot;

/// Shared handle to the running game. The world sits behind one lock, so
/// connection handlers and the tick never mutate it at the same time.
/// Leaderboard writes happen under the same lock, so a score can never be
/// recorded for a player whose removal has already run.
#[derive(Clone)]
pub struct GameServer {
    world: Arc<Mutex<World>>,
    broadcaster: Broadcaster,
    leaderboard: LeaderboardGateway,
    next_connection_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for GameServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameServer")
            .field("leaderboard", &self.leaderboard)
            .finish()
    }
}

impl GameServer {
    pub fn new(world: World, leaderboard: LeaderboardGateway) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
            broadcaster: Broadcaster::new(),
            leaderboard,
            next_connection_id: Arc::new(AtomicU64::new(1)),
        }
    }

    #[cfg(test)]
    pub fn leaderboard(&self) -> &LeaderboardGateway {
        &self.leaderboard
    }

    pub async fn tick_interval(&self) -> Duration {
        self.world.lock().await.settings().tick_interval
    }

    pub async fn open_connection(&self, client: ClientHandle) -> ConnectionId {
        let connection_id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        self.world.lock().await.register(connection_id);
        self.broadcaster.register(connection_id, client).await;
        log!("[{}] connection opened", connection_id);
        connection_id
    }

    /// Drops the session, clears its leaderboard entry and closes the
    /// socket. Safe to call more than once.
    pub async fn close_connection(&self, connection_id: ConnectionId) {
        let removed_player = {
            let mut world = self.world.lock().await;
            let removed = world.unregister(&connection_id);
            if let Some(player) = &removed {
                self.leaderboard.remove_score(&player.id);
            }
            removed
        };
        let was_registered = self.broadcaster.unregister(&connection_id).await;

        if let Some(player) = removed_player {
            log!("[{}] player '{}' ({}) left", connection_id, player.name, player.id);
        }
        if was_registered {
            let remaining = self.broadcaster.connection_count().await;
            log!("[{}] connection closed, {} still open", connection_id, remaining);
        }
    }

    pub async fn close_all(&self) {
        for connection_id in self.broadcaster.connection_ids().await {
            self.close_connection(connection_id).await;
        }
    }

    /// Ignored for connections that are no longer registered.
    pub async fn handle_join(&self, connection_id: ConnectionId, client: &ClientHandle, name: &str) {
        let (update, joined) = {
            let mut world = self.world.lock().await;
            let Some(outcome) = world.join(connection_id, name) else {
                return;
            };

            let welcome = match &outcome {
                JoinOutcome::Joined { player_id, color, .. } => {
                    let settings = world.settings();
                    Some(ServerMessage::Welcome(WelcomeMessage {
                        id: player_id.to_string(),
                        color: color.to_string(),
                        cols: settings.field_size.cols,
                        rows: settings.field_size.rows,
                        tick_millis: settings.tick_millis(),
                    }))
                }
                JoinOutcome::Renamed(_) => None,
            };

            // queued under the lock so no snapshot containing the player
            // can overtake the welcome
            if let Some(welcome) = &welcome
                && let Err(e) = enqueue_message(client, welcome)
            {
                log!("[{}] failed to send welcome: {}", connection_id, e);
                drop(world);
                self.close_connection(connection_id).await;
                return;
            }

            let update = match outcome {
                JoinOutcome::Joined { score, .. } => score,
                JoinOutcome::Renamed(score) => score,
            };
            self.leaderboard.record_score(&update.player_id, &update.name, update.score);
            (update, welcome.is_some())
        };

        if joined {
            log!("[{}] '{}' joined as {}", connection_id, update.name, update.player_id);
        }
    }

    pub async fn handle_direction(&self, connection_id: ConnectionId, direction_text: &str) {
        let Ok(direction) = direction_text.parse::<Direction>() else {
            return;
        };
        self.world.lock().await.set_direction(&connection_id, direction);
    }

    pub async fn handle_ping(&self, connection_id: ConnectionId, client: &ClientHandle) {
        if !self.broadcaster.is_registered(&connection_id).await {
            return;
        }
        let pong = ServerMessage::Pong {
            now: chrono::Utc::now().timestamp_millis(),
        };
        if let Err(e) = enqueue_message(client, &pong) {
            log!("[{}] failed to send pong: {}", connection_id, e);
            self.close_connection(connection_id).await;
        }
    }

    /// Runs one simulation step and fans the snapshot out to every
    /// connection, joined or not.
    pub async fn run_tick(&self) -> StateMessage {
        let (outcome, snapshot) = {
            let mut world = self.world.lock().await;
            let outcome = world.tick();
            for update in &outcome.score_updates {
                self.leaderboard.record_score(&update.player_id, &update.name, update.score);
            }
            (outcome, WorldSnapshot::capture(&world))
        };

        let state = snapshot.into_message(self.leaderboard.top_n(LEADERBOARD_SIZE));

        match encode_server_json(&ServerMessage::State(state.clone())) {
            Ok(text) => {
                let failed = self.broadcaster.broadcast_to_all(&text).await;
                for connection_id in failed {
                    self.close_connection(connection_id).await;
                }
            }
            Err(e) => log!("Failed to encode state for tick {}: {}", outcome.tick, e),
        }

        state
    }
}

fn enqueue_message(client: &ClientHandle, message: &ServerMessage) -> Result<(), String> {
    let text = encode_server_json(message).map_err(|e| format!("encode failed: {}", e))?;
    client.try_send(text)
}

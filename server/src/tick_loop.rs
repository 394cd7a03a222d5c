use tokio::time::{interval, MissedTickBehavior};

use common::log;

use crate::game_server::GameServer;

/// Drives the simulation. Ticks run one after another on this task only;
/// a tick that overruns delays the next one instead of bunching them up.
pub async fn run(game_server: GameServer) {
    let tick_interval = game_server.tick_interval().await;
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log!("Tick loop started, interval {}ms", tick_interval.as_millis());

    loop {
        ticker.tick().await;
        game_server.run_tick().await;
    }
}

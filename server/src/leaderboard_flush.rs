use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use common::leaderboard::LeaderboardGateway;
use common::log;

/// Writes buffered leaderboard changes off the async workers, so a file
/// backed store never blocks the tick.
pub struct LeaderboardFlushTask {
    gateway: LeaderboardGateway,
    flush_interval: Duration,
}

impl LeaderboardFlushTask {
    pub fn new(gateway: LeaderboardGateway, flush_interval: Duration) -> Self {
        Self {
            gateway,
            flush_interval,
        }
    }

    pub async fn run(&self) {
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            flush_blocking(&self.gateway).await;
        }
    }
}

pub async fn flush_blocking(gateway: &LeaderboardGateway) {
    let gateway = gateway.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || gateway.flush()).await {
        log!("Leaderboard flush task failed: {}", e);
    }
}

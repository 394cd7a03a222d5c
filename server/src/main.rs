mod broadcaster;
mod game_server;
mod leaderboard_flush;
mod message_handler;
mod server_config;
mod snapshot;
mod tick_loop;
mod web_server;
mod ws_handler;

use clap::Parser;
use common::config::{ConfigManager, Validate};
use common::games::SessionRng;
use common::games::snake::World;
use common::{log, logger};

use game_server::GameServer;
use leaderboard_flush::{flush_blocking, LeaderboardFlushTask};
use server_config::{ServerConfig, LEADERBOARD_FLUSH_INTERVAL};
use web_server::run_web_server;

#[derive(Parser)]
#[command(name = "snake_arena_server")]
struct Args {
    /// YAML config file; a missing file means defaults
    #[arg(long, env = "SNAKE_CONFIG", default_value = "snake_arena.yaml")]
    config: String,

    #[arg(long, env = "SNAKE_BIND_ADDRESS")]
    bind_address: Option<String>,

    #[arg(long, env = "SNAKE_WORLD_COLS")]
    cols: Option<i32>,

    #[arg(long, env = "SNAKE_WORLD_ROWS")]
    rows: Option<i32>,

    #[arg(long, env = "SNAKE_TICK_MILLIS")]
    tick_millis: Option<u64>,

    #[arg(long, env = "SNAKE_LEADERBOARD_KEY")]
    leaderboard_key: Option<String>,

    #[arg(long)]
    use_log_prefix: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(bind_address) = &self.bind_address {
            config.bind_address = bind_address.clone();
        }
        if let Some(cols) = self.cols {
            config.world.cols = cols;
        }
        if let Some(rows) = self.rows {
            config.world.rows = rows;
        }
        if let Some(tick_millis) = self.tick_millis {
            config.tick_millis = tick_millis;
        }
        if let Some(key) = &self.leaderboard_key {
            config.leaderboard.key = key.clone();
        }
    }
}

fn load_config(args: &Args) -> Result<ServerConfig, String> {
    let manager: ConfigManager<_, ServerConfig> = ConfigManager::from_yaml_file(&args.config);
    let mut config = manager.get_config()?;
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Server".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config = load_config(&args)?;
    let settings = config.world_settings();
    let gateway = config.leaderboard.open_gateway()?;

    let rng = SessionRng::from_random();
    log!(
        "World {}x{}, tick {}ms, seed {}",
        settings.field_size.cols,
        settings.field_size.rows,
        settings.tick_millis(),
        rng.seed()
    );

    let game_server = GameServer::new(World::new(settings, rng), gateway.clone());

    let tick_task = tokio::spawn(tick_loop::run(game_server.clone()));
    let flush_task = LeaderboardFlushTask::new(gateway.clone(), LEADERBOARD_FLUSH_INTERVAL);
    let flush_handle = tokio::spawn(async move { flush_task.run().await });

    let shutdown_server = game_server.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        log!("Shutdown signal received, closing connections...");
        shutdown_server.close_all().await;
    };

    let result = run_web_server(game_server, &config.bind_address, shutdown_signal).await;
    tick_task.abort();
    flush_handle.abort();
    flush_blocking(&gateway).await;
    result?;

    log!("Server shut down gracefully");

    Ok(())
}

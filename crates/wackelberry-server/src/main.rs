//! Wackelberry bot binary.
//!
//! # Usage
//!
//! ```bash
//! # JSON user document in the working directory
//! wackelberry
//!
//! # redb store, faster updates for a demo
//! wackelberry --store users.redb --update-interval-secs 2 --duration-secs 60
//!
//! # Feed a scripted conversation
//! printf '1 Admin /status\n7 Ann /register\n1 Admin /approve 7\n7 Ann /live\n' | wackelberry
//! ```
//!
//! Each stdin line is `<user_id> <display name> /<command> [args]`. When
//! input ends the bot keeps serving active live shares until they expire or
//! Ctrl-C cancels them.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wackelberry_core::{BroadcastConfig, Position, PositionSource};
use wackelberry_server::{
    Bot, BotConfig, ConsoleChannel, FixedPosition, JsonFileStorage, RedbStorage, ServerError,
    SimulatedGps, StoreBackend, SystemEnv, UserStorage, run_console,
};

/// Access-gated live location bot
#[derive(Parser, Debug)]
#[command(name = "wackelberry")]
#[command(about = "Access-gated live location bot with a console front-end")]
#[command(version)]
struct Args {
    /// User document; a `.redb` extension selects the redb backend
    #[arg(long, default_value = "users.json")]
    store: PathBuf,

    /// Seconds between two position updates
    #[arg(long, default_value_t = 15)]
    update_interval_secs: u64,

    /// Validity of a live share in seconds
    #[arg(long, default_value_t = 3600)]
    duration_secs: u64,

    /// Latitude reported when no fix is available
    #[arg(long, default_value_t = 37.7749, allow_negative_numbers = true)]
    fallback_lat: f64,

    /// Longitude reported when no fix is available
    #[arg(long, default_value_t = -122.4194, allow_negative_numbers = true)]
    fallback_lon: f64,

    /// Report the fallback position without simulated jitter
    #[arg(long)]
    fixed_position: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> BotConfig {
        BotConfig {
            store_path: self.store.clone(),
            broadcast: BroadcastConfig {
                update_interval: Duration::from_secs(self.update_interval_secs),
                total_duration: Duration::from_secs(self.duration_secs),
                fallback: Position::new(self.fallback_lat, self.fallback_lon, 0),
            },
            fixed_position: self.fixed_position,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.config();
    config.validate()?;

    tracing::info!(
        store = %config.store_path.display(),
        backend = ?config.backend(),
        interval_secs = config.broadcast.update_interval.as_secs(),
        duration_secs = config.broadcast.total_duration.as_secs(),
        "Wackelberry starting"
    );

    match config.backend() {
        StoreBackend::Json => with_source(JsonFileStorage::new(&config.store_path), &config).await?,
        StoreBackend::Redb => with_source(RedbStorage::open(&config.store_path)?, &config).await?,
    }

    Ok(())
}

async fn with_source<S: UserStorage>(storage: S, config: &BotConfig) -> Result<(), ServerError> {
    let env = SystemEnv::new();
    let fallback = config.broadcast.fallback;

    if config.fixed_position {
        serve(storage, FixedPosition(fallback), env, config).await
    } else {
        serve(storage, SimulatedGps::new(env.clone(), fallback), env, config).await
    }
}

async fn serve<S, P>(
    storage: S,
    source: P,
    env: SystemEnv,
    config: &BotConfig,
) -> Result<(), ServerError>
where
    S: UserStorage,
    P: PositionSource,
{
    // Surface an unreadable document at startup instead of on the first command.
    let admins = storage.load()?.admins().count();
    if admins == 0 {
        tracing::warn!("user document has no admin; nobody can approve registrations");
    }

    let channel = Arc::new(ConsoleChannel::new());
    let bot = Bot::build(storage, Arc::clone(&channel), source, env, config.broadcast);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = run_console(&bot, channel.as_ref(), stdin) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            bot.live().cancel_all();
            bot.live().wait_idle().await;
            return Ok(());
        },
    }

    if bot.live().active_count() > 0 {
        tracing::info!(active = bot.live().active_count(), "waiting for live shares to end");
        tokio::select! {
            () = bot.live().wait_idle() => {},
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                bot.live().cancel_all();
                bot.live().wait_idle().await;
            },
        }
    }

    tracing::info!("Wackelberry stopped");
    Ok(())
}

use std::time::Duration;

use clap::Parser;
use cm_common::cache::ResultCache;
use cm_common::db::{create_pool_from_url, run_migrations, PgResultCache};
use cm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use dotenvy::dotenv;
use rand::Rng;
use tracing::{error, info};

/// Deletes expired rows from the matching result cache on an interval.
/// Expired rows are already invisible to reads; the sweeper only keeps the
/// table from growing without bound.
#[derive(Debug, Parser)]
#[command(name = "cm-sweeper", about = "TTL sweeper for cached matching results")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Seconds between sweeps
    #[arg(long, env = "CM_SWEEP_INTERVAL_SECS", default_value_t = 3600)]
    interval_secs: u64,

    /// Run one sweep and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

/// Random delay added to each interval so multiple sweeper replicas do not
/// hit the table at the same instant.
fn jitter_secs(interval_secs: u64) -> u64 {
    let max = (interval_secs / 10).max(1);
    rand::thread_rng().gen_range(0..=max)
}

async fn sweep_once(cache: &PgResultCache) {
    match cache.sweep_expired().await {
        Ok(deleted) => info!(deleted, "swept expired matching results"),
        Err(err) => error!(error = %err, "sweep failed"),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();

    let pool = match create_pool_from_url(&cli.database_url) {
        Ok(pool) => pool,
        Err(err) => {
            error!(error = %err, "failed to build database pool");
            std::process::exit(1);
        }
    };

    if let Err(err) = run_migrations(&pool).await {
        error!(error = %err, "failed to run migrations");
        std::process::exit(1);
    }

    let cache = PgResultCache::new(pool);

    if cli.once {
        sweep_once(&cache).await;
        return;
    }

    info!(interval_secs = cli.interval_secs, "cm-sweeper running");

    loop {
        sweep_once(&cache).await;

        let pause = Duration::from_secs(cli.interval_secs + jitter_secs(cli.interval_secs));
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }
}

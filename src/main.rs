use chrono::{Duration, TimeZone, Utc};
use lexicross::{
    config::{load_config, VERSION},
    db::{init_session_manager, SessionManager},
    services::stats::{run_ratings_job, run_stats_job},
    utils::logging,
};
use log::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = load_config().unwrap_or_default();

    // Initialize logging
    logging::setup(config.logging);

    info!("Starting lexicross core v{VERSION}");

    let manager = match SessionManager::connect(&config.database).await {
        Ok(manager) => manager,
        Err(err) => {
            error!("Failed to connect to database: {err}");
            return;
        }
    };
    let manager = init_session_manager(manager);

    // The binary doubles as the cron entry point for the nightly jobs;
    // the RPC surface lives in a separate crate that links this one
    let command = std::env::args().nth(1);
    match command.as_deref() {
        Some("stats") => run_nightly_stats(manager).await,
        Some("ratings") => {
            if let Err(err) = run_ratings_job(manager).await {
                error!("Ratings job failed: {err}");
            }
        }
        Some(other) => {
            error!("Unknown command '{other}'; expected 'stats' or 'ratings'");
        }
        None => {
            info!("No command given; database is initialized and reachable");
        }
    }
}

/// Compute yesterday's statistics window and run the pipeline
async fn run_nightly_stats(manager: &SessionManager) {
    let now = Utc::now();
    let yesterday = now - Duration::days(1);
    // Midnight boundaries of the processed day
    let from = yesterday
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive));
    let Some(from) = from else {
        error!("Could not compute the stats window");
        return;
    };
    let to = from + Duration::days(1);

    match run_stats_job(manager, from, to, None).await {
        Ok(info) if info.completed => {
            log::info!(
                "Stats completed: {} games, {} users",
                info.games_processed,
                info.users_touched
            );
        }
        Ok(_) => {
            log::warn!("Stats run stopped at its deadline; re-run to resume");
        }
        Err(err) => {
            error!("Stats job failed: {err}");
        }
    }
}

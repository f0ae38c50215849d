// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::{
    db::{profiledb::ProfileExt, taskdb::TaskExt},
    AppState,
};

const HOUSEKEEPING_INTERVAL_SECS: u64 = 3600;

/// Hourly sweep that turns off lapsed subscriptions and expired featured
/// boosts so stored flags match what reads compute from timestamps.
pub async fn start_housekeeping_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(HOUSEKEEPING_INTERVAL_SECS));

    loop {
        interval.tick().await;

        tracing::info!("Running housekeeping job at {}", Utc::now());

        match app_state.db_client.expire_lapsed_subscriptions().await {
            Ok(count) if count > 0 => tracing::info!("Expired {} worker subscriptions", count),
            Ok(_) => {}
            Err(e) => tracing::error!("Subscription expiry failed: {}", e),
        }

        match app_state.db_client.clear_expired_features().await {
            Ok(count) if count > 0 => tracing::info!("Cleared {} expired featured boosts", count),
            Ok(_) => {}
            Err(e) => tracing::error!("Featured boost expiry failed: {}", e),
        }
    }
}

//! Scheduled full resync.
//!
//! A background task that fires at fixed UTC hours (default 01:00 and
//! 18:00), wiping the document tables and re-mirroring every tenant. The
//! loop outlives any individual failure.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use tokio::task::JoinHandle;

use searcher_client::{DocumentFeed, SyncEngine};

/// Spawn the resync loop. Runs until the process exits.
pub fn spawn<F: DocumentFeed>(engine: SyncEngine<F>, hours: Vec<u32>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let delay = next_fire_delay(Utc::now(), &hours);
            tracing::info!(in_secs = delay.as_secs(), "next scheduled resync");
            tokio::time::sleep(delay).await;

            tracing::info!("scheduled resync firing");
            if let Err(e) = engine.sync_all().await {
                tracing::error!(error = %e, "scheduled resync failed");
            }
        }
    })
}

/// Time until the next configured UTC hour, measured from `now`.
///
/// Falls back to 24h when no hours are configured (validation rejects that
/// case at startup, this keeps the loop alive regardless).
fn next_fire_delay(now: DateTime<Utc>, hours: &[u32]) -> std::time::Duration {
    let next = hours
        .iter()
        .filter_map(|&hour| {
            let today = now.with_hour(hour)?.with_minute(0)?.with_second(0)?.with_nanosecond(0)?;
            Some(if today > now { today } else { today + ChronoDuration::days(1) })
        })
        .min();

    match next {
        Some(at) => (at - now).to_std().unwrap_or(std::time::Duration::ZERO),
        None => std::time::Duration::from_secs(24 * 3600),
    }
}

//! Cached time to avoid syscalls on the ingest path.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

static NOW_MILLIS: AtomicI64 = AtomicI64::new(0);

fn system_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Starts the time caching ticker.
/// Updates the cached value at the specified resolution until the token is cancelled.
pub fn start(resolution: Duration) -> CancellationToken {
    NOW_MILLIS.store(system_millis(), Ordering::Relaxed);

    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::task::spawn(async move {
        let mut interval = tokio::time::interval(resolution);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    NOW_MILLIS.store(system_millis(), Ordering::Relaxed);
                }
                _ = token_clone.cancelled() => {
                    break;
                }
            }
        }
    });

    token
}

/// Returns the current wall clock as signed milliseconds since the Unix epoch.
/// Reads the cached value when the ticker runs, otherwise falls back to a syscall.
pub fn now_unix_millis() -> i64 {
    let cached = NOW_MILLIS.load(Ordering::Relaxed);
    if cached > 0 {
        cached
    } else {
        system_millis()
    }
}

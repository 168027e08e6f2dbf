//! Bounded retry of optimistic-concurrency conflicts

use std::future::Future;
use crate::utils::errors::Result;
use crate::utils::logging::log_conflict_retry;

/// Run `op` until it succeeds, fails with a non-conflict error, or has been
/// attempted `max_attempts` times. Each attempt must re-read the state it
/// mutates; nothing is carried over between attempts.
pub async fn retry_on_conflict<T, F, Fut>(
    event_id: i64,
    operation: &str,
    max_attempts: u32,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_conflict() && attempt < max_attempts => {
                log_conflict_retry(event_id, operation, attempt, max_attempts);
                attempt += 1;
            }
            other => return other,
        }
    }
}

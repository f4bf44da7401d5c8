//! Blocking bridge for the `sqlx` clients.
//!
//! # Invariants
//! - Every client owns a current-thread runtime; all pool work runs inside
//!   `block_on` on it, so callers never need an async context.
//! - `sqlx` objects whose drop spawns work are dropped inside the runtime
//!   context.

use super::{DbError, DbResult};
use log::{error, info};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};

pub(super) const MAX_CONNECTIONS: u32 = 4;
pub(super) const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn blocking_runtime() -> DbResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(DbError::driver)
}

/// Builds a runtime and runs `connect` on it, emitting `db_open` events.
pub(super) fn open_pool<P, F>(
    mode: &'static str,
    connect: impl FnOnce() -> F,
) -> DbResult<(Runtime, P)>
where
    F: Future<Output = Result<P, sqlx::Error>>,
{
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let runtime = blocking_runtime()?;
    match runtime.block_on(connect()) {
        Ok(pool) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok((runtime, pool))
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

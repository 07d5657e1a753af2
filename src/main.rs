use workpool::{Config, PoolError, WorkerPool};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};
use tracing_subscriber::EnvFilter;


fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pool = WorkerPool::with_config(Config::default())?;
    let partial: Vec<AtomicU64> = (0..pool.config().actual_threads())
        .map(|_| AtomicU64::new(0))
        .collect();

    let now = Instant::now();
    pool.par_for_each_index(5_000_000, |worker, i| {
        partial[worker].fetch_add(i as u64, Ordering::Relaxed);
    })?;
    let sum: u64 = partial.iter().map(|p| p.load(Ordering::Relaxed)).sum();

    tracing::info!(sum, elapsed = ?now.elapsed(), threads = pool.num_threads(), "done");
    println!("elapsed: {:?}", now.elapsed());
    Ok(())
}

//! Parallel work distribution for hashing and copying
//!
//! Both parallel phases of a run follow the same scheme: partition the work
//! list into interleaved shards, run one worker per shard on a dedicated
//! thread pool, and merge the per-shard result maps after all workers have
//! joined. Item `i` lands in shard `i % workers`, so a sorted input (paths
//! sorted by the scanner, which tends to cluster large files together)
//! still yields size-balanced shards.
//!
//! Workers never share state: each owns its shard exclusively and returns a
//! plain map, so no locking is needed inside a worker and the merge is
//! conflict-free by construction. Per-item failures are the worker's
//! business: it logs them and omits the item. A worker that panics is a
//! different matter entirely: the panic is caught at the shard boundary and
//! the whole phase fails with [`SnapvaultError::Worker`].

use crate::error::{Result, SnapvaultError};
use rayon::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error};

/// Partition `items` into `workers` interleaved shards
///
/// Item `i` goes to shard `i % workers`. Every shard ends up with
/// `floor(N/W)` or `ceil(N/W)` items and the shards together contain
/// exactly the input items, each once.
pub fn shard<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let mut shards: Vec<Vec<T>> = (0..workers).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        shards[i % workers].push(item);
    }
    shards
}

/// Run `worker_fn` over every shard concurrently and merge the results
///
/// Spins up a thread pool of exactly `workers` threads, applies
/// `worker_fn(shard_index, shard)` to each shard, and unions the returned
/// partial maps. Shards are disjoint, so the union never overwrites an
/// entry.
///
/// A panicking worker aborts the entire phase; per-item failures must be
/// handled (logged and omitted) inside `worker_fn` itself.
pub fn run_sharded<T, K, V, F>(items: Vec<T>, workers: usize, worker_fn: F) -> Result<HashMap<K, V>>
where
    T: Send,
    K: Eq + Hash + Send,
    V: Send,
    F: Fn(usize, Vec<T>) -> HashMap<K, V> + Send + Sync,
{
    let total = items.len();
    let shards = shard(items, workers);
    debug!(
        "Distributing {} items across {} workers",
        total,
        shards.len()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| SnapvaultError::worker(format!("failed to build worker pool: {e}")))?;

    let outcomes: Vec<std::thread::Result<HashMap<K, V>>> = pool.install(|| {
        shards
            .into_par_iter()
            .enumerate()
            .map(|(index, shard)| {
                catch_unwind(AssertUnwindSafe(|| worker_fn(index, shard)))
            })
            .collect()
    });

    let mut merged = HashMap::with_capacity(total);
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(partial) => merged.extend(partial),
            Err(_) => {
                error!("Worker {} terminated abnormally", index);
                return Err(SnapvaultError::worker(format!(
                    "worker {index} terminated abnormally"
                )));
            }
        }
    }
    Ok(merged)
}

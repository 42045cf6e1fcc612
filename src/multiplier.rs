//! The common interface of every multiplication strategy, and the two worker
//! runtimes they execute on.

use std::thread;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::block_grid::BlockGridMultiplier;
use crate::comm::{ChannelEndpoint, ChannelNetwork};
use crate::config::{Variant, WorkerConfig};
use crate::data_parallel::DataParallelMultiplier;
use crate::error::{MatMulError, Result};
use crate::matrix::Matrix;
use crate::row_block::RowBlockMultiplier;

/// Computes `C = A * B`.
///
/// Implementations validate their partitioning before doing any work and never
/// mutate `a` or `b`.
pub trait Multiplier: Send + Sync {
    fn name(&self) -> &'static str;

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;
}

/// Builds the multiplier for `variant`.
pub fn for_variant(variant: Variant, config: WorkerConfig) -> Box<dyn Multiplier> {
    match variant {
        Variant::DataParallel => Box::new(DataParallelMultiplier::new(config)),
        Variant::RowBlock(mode) => Box::new(RowBlockMultiplier::new(config, mode)),
        Variant::BlockGrid(mode) => Box::new(BlockGridMultiplier::new(config, mode)),
    }
}

/// A rayon pool with exactly `workers` threads.
pub(crate) fn worker_pool(workers: usize) -> Result<ThreadPool> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("mm-worker-{index}"))
        .build()?)
}

/// Runs one worker per state on its own thread, each connected only through a
/// [`ChannelEndpoint`], and returns the matrix assembled by rank 0.
///
/// `states[r]` is moved onto rank `r`'s thread. Each worker returns `Some` on the
/// coordinator and `None` elsewhere.
pub(crate) fn run_ranks<S, F>(states: Vec<S>, worker: F) -> Result<Matrix>
where
    S: Send,
    F: Fn(S, ChannelEndpoint) -> Result<Option<Matrix>> + Sync,
{
    let endpoints = ChannelNetwork::create(states.len());
    let worker = &worker;

    let outcomes: Vec<Result<Option<Matrix>>> = thread::scope(|s| {
        let handles: Vec<_> = states
            .into_iter()
            .zip(endpoints)
            .map(|(state, endpoint)| s.spawn(move || worker(state, endpoint)))
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(MatMulError::WorkerPanicked { rank }))
            })
            .collect()
    });

    let mut assembled = None;
    let mut first_error: Option<MatMulError> = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Some(matrix)) if rank == 0 => assembled = Some(matrix),
            Ok(_) => {}
            Err(err) => {
                debug!(rank, error = %err, "worker failed");
                // A peer disconnect is usually the echo of another rank's failure.
                let replace = match &first_error {
                    None => true,
                    Some(MatMulError::PeerDisconnected { .. }) => {
                        !matches!(err, MatMulError::PeerDisconnected { .. })
                    }
                    Some(_) => false,
                };
                if replace {
                    first_error = Some(err);
                }
            }
        }
    }

    match (first_error, assembled) {
        (Some(err), _) => Err(err),
        (None, Some(matrix)) => Ok(matrix),
        (None, None) => Err(MatMulError::WorkerPanicked { rank: 0 }),
    }
}

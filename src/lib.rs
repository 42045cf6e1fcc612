//! Parallel dense integer matrix multiplication.
//!
//! Three decompositions of `C = A * B` over a fixed number of workers, each checked
//! against a serial oracle:
//!
//! - [`RowBlockMultiplier`]: 1D row/column blocks with a ring rotation of B blocks.
//! - [`BlockGridMultiplier`]: 2D Cannon-style grid with rotation and per-row
//!   aggregation of partial sums.
//! - [`DataParallelMultiplier`]: the serial loop with its outer loop split.
//!
//! The partitioned strategies run either on shared memory or as message-passing
//! workers connected through a [`Communicator`].

pub mod block_grid;
pub mod comm;
pub mod config;
pub mod data_parallel;
pub mod error;
pub mod factory;
pub mod matrix;
pub mod multiplier;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod row_block;
pub mod sequential;
pub mod tile;
pub mod verify;

#[cfg(test)]
mod tests;

pub use block_grid::{BlockGridMultiplier, BlockGridWorker};
pub use comm::{ChannelEndpoint, ChannelNetwork, Communicator};
pub use config::{ExecutionMode, ExperimentConfig, Variant, WorkerConfig};
pub use data_parallel::DataParallelMultiplier;
pub use error::{ErrorKind, MatMulError, Result};
pub use factory::{MatrixFactory, MAX_MATRIX_VALUE};
pub use matrix::{Element, Matrix};
pub use multiplier::{for_variant, Multiplier};
pub use orchestrator::{ExperimentReport, Orchestrator, VariantOutcome};
pub use partition::{Dimensions, GridCoord, GridPlan, RowBlockPlan, TileRange};
pub use report::{timed, RunRecord, Timed};
pub use row_block::{RowBlockMultiplier, RowBlockWorker};
pub use sequential::SequentialMultiplier;
pub use tile::Tile;
pub use verify::{Mismatch, Verification, Verifier};

/// Multiplies `a * b` with `variant` and verifies the result against the oracle.
pub fn multiply_and_verify(
    variant: Variant,
    config: WorkerConfig,
    a: &Matrix,
    b: &Matrix,
) -> Result<(Matrix, Verification)> {
    let oracle = SequentialMultiplier::product(a, b)?;
    let multiplier = for_variant(variant, config);
    let product = timed(variant.label(), config.report_timing, || multiplier.multiply(a, b)).value?;
    let verification = Verifier::verify(&product, &oracle, config.debug)?;
    Ok((product, verification))
}

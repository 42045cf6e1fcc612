//! 1D row/column block decomposition with a ring rotation of B column blocks.
//!
//! Worker `r` owns rows `[r*m/P, (r+1)*m/P)` of A and columns `[r*q/P, (r+1)*q/P)` of
//! B. In round `t` it multiplies its fixed A rows against the B column block owned by
//! worker `(r - t) mod P` and writes the result at that worker's column offset, so
//! after `P` rounds its row strip of C is complete. Rank 0 then gathers the strips in
//! rank order.

use rayon::prelude::*;
use tracing::debug;

use crate::comm::Communicator;
use crate::config::{ExecutionMode, WorkerConfig};
use crate::error::Result;
use crate::matrix::{Element, Matrix};
use crate::multiplier::{run_ranks, worker_pool, Multiplier};
use crate::partition::{Dimensions, RowBlockPlan};
use crate::tile::Tile;

pub struct RowBlockMultiplier {
    config: WorkerConfig,
    mode: ExecutionMode,
}

impl RowBlockMultiplier {
    pub fn new(config: WorkerConfig, mode: ExecutionMode) -> Self {
        Self { config, mode }
    }

    /// Validates the partition for `a * b` without computing anything.
    pub fn plan(&self, a: &Matrix, b: &Matrix) -> Result<RowBlockPlan> {
        RowBlockPlan::new(Dimensions::of(a, b)?, self.config.workers)
    }

    /// All workers share A, the pre-partitioned B column blocks and the result
    /// matrix; each writes only its own row strip.
    fn multiply_shared(&self, plan: RowBlockPlan, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let Dimensions { m, n, q } = plan.dimensions();
        let pool = worker_pool(plan.workers())?;

        let column_blocks: Vec<Tile> = (0..plan.workers())
            .map(|rank| b.block(0..n, plan.col_range(rank)))
            .collect();
        let column_blocks = &column_blocks;
        let debug = self.config.debug;

        let mut result = Matrix::zeros(m, q);
        pool.install(|| {
            result
                .as_mut_slice()
                .par_chunks_mut(plan.row_strip_len())
                .enumerate()
                .for_each(|(rank, strip)| {
                    let rows = plan.row_range(rank);
                    let a_rows = a.block(rows, 0..n);
                    for round in 0..plan.workers() {
                        let owner = plan.receive_from(rank, round);
                        if debug {
                            debug!(rank, round, owner, "1d shared round");
                        }
                        let partial = block_product(&a_rows, &column_blocks[owner]);
                        write_columns(strip, q, owner * plan.cols_per_worker(), &partial);
                    }
                });
        });

        Ok(result)
    }

    fn multiply_distributed(&self, plan: RowBlockPlan, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let workers = RowBlockWorker::scatter(plan, a, b);
        let debug = self.config.debug;
        run_ranks(workers, |worker, endpoint| worker.run(&endpoint, debug))
    }
}

impl Multiplier for RowBlockMultiplier {
    fn name(&self) -> &'static str {
        match self.mode {
            ExecutionMode::SharedMemory => "1d-shared",
            ExecutionMode::MessagePassing => "1d-distributed",
        }
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let plan = self.plan(a, b)?;
        match self.mode {
            ExecutionMode::SharedMemory => self.multiply_shared(plan, a, b),
            ExecutionMode::MessagePassing => self.multiply_distributed(plan, a, b),
        }
    }
}

/// Private state of one message-passing worker: its own partitions only.
#[derive(Clone, Debug)]
pub struct RowBlockWorker {
    rank: usize,
    plan: RowBlockPlan,
    a_rows: Tile,
    b_cols: Tile,
}

impl RowBlockWorker {
    /// Copies each rank's owned row block of A and column block of B.
    pub fn scatter(plan: RowBlockPlan, a: &Matrix, b: &Matrix) -> Vec<Self> {
        let n = plan.dimensions().n;
        (0..plan.workers())
            .map(|rank| Self {
                rank,
                plan,
                a_rows: a.block(plan.row_range(rank), 0..n),
                b_cols: b.block(0..n, plan.col_range(rank)),
            })
            .collect()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn a_rows(&self) -> &Tile {
        &self.a_rows
    }

    pub fn b_cols(&self) -> &Tile {
        &self.b_cols
    }

    /// Runs the ring rotation and the gather. Returns the assembled C on rank 0.
    pub fn run<C: Communicator>(self, comm: &C, debug: bool) -> Result<Option<Matrix>> {
        let plan = self.plan;
        let rank = self.rank;
        let Dimensions { m, n, q } = plan.dimensions();
        let w = plan.cols_per_worker();

        let mut strip = vec![0; plan.row_strip_len()];
        let mut incoming = Tile::zeros(n, w);

        for round in 0..plan.workers() {
            let owner = plan.receive_from(rank, round);
            let block = if round == 0 {
                &self.b_cols
            } else {
                let dest = plan.send_to(rank, round);
                comm.send(self.b_cols.as_slice(), dest)?;
                comm.receive(incoming.as_mut_slice(), owner)?;
                &incoming
            };
            if debug {
                debug!(rank, round, owner, "1d distributed round");
            }

            let partial = block_product(&self.a_rows, block);
            write_columns(&mut strip, q, owner * w, &partial);

            if round > 0 {
                comm.barrier()?;
            }
        }

        if rank != 0 {
            comm.send(&strip, 0)?;
            return Ok(None);
        }

        let strip_len = plan.row_strip_len();
        let mut result = Matrix::zeros(m, q);
        result.as_mut_slice()[..strip_len].copy_from_slice(&strip);
        for src in 1..plan.workers() {
            let range = src * strip_len..(src + 1) * strip_len;
            comm.receive(&mut result.as_mut_slice()[range], src)?;
        }
        Ok(Some(result))
    }
}

fn block_product(a_rows: &Tile, b_cols: &Tile) -> Tile {
    let mut partial = Tile::zeros(a_rows.rows(), b_cols.cols());
    partial.multiply_accumulate(a_rows, b_cols);
    partial
}

/// Copies `tile` into the row-major `strip` (width `strip_cols`) at `col_offset`.
fn write_columns(strip: &mut [Element], strip_cols: usize, col_offset: usize, tile: &Tile) {
    for (r, row) in strip.chunks_exact_mut(strip_cols).enumerate().take(tile.rows()) {
        row[col_offset..col_offset + tile.cols()].copy_from_slice(tile.row(r));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::MatrixFactory;
    use crate::sequential::SequentialMultiplier;

    fn multiply(workers: usize, mode: ExecutionMode, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        RowBlockMultiplier::new(WorkerConfig::new(workers).with_debug(true), mode).multiply(a, b)
    }

    #[test]
    fn test_matches_sequential_both_modes() {
        let a = MatrixFactory::generate(8, 5, 10, 11);
        let b = MatrixFactory::generate(5, 12, 10, 12);
        let expected = SequentialMultiplier::product(&a, &b).unwrap();

        for workers in [1, 2, 4] {
            for mode in [ExecutionMode::SharedMemory, ExecutionMode::MessagePassing] {
                assert_eq!(multiply(workers, mode, &a, &b).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_ones_times_identity() {
        let a = MatrixFactory::filled(4, 4, 1);
        let id = MatrixFactory::identity(4);
        for mode in [ExecutionMode::SharedMemory, ExecutionMode::MessagePassing] {
            assert_eq!(multiply(2, mode, &a, &id).unwrap(), a);
        }
    }

    #[test]
    fn test_scatter_ownership() {
        let a = MatrixFactory::generate(4, 4, 10, 1);
        let b = MatrixFactory::generate(4, 4, 10, 2);
        let plan = RowBlockPlan::new(Dimensions::new(4, 4, 4), 2).unwrap();
        let workers = RowBlockWorker::scatter(plan, &a, &b);

        assert_eq!(workers.len(), 2);
        assert_eq!(workers[1].rank(), 1);
        assert_eq!(workers[0].a_rows(), &a.block(0..2, 0..4));
        assert_eq!(workers[1].a_rows(), &a.block(2..4, 0..4));
        assert_eq!(workers[1].b_cols(), &b.block(0..4, 2..4));
    }

    #[test]
    fn test_rejects_more_workers_than_rows() {
        let a = MatrixFactory::generate(2, 4, 10, 1);
        let b = MatrixFactory::generate(4, 8, 10, 2);
        for mode in [ExecutionMode::SharedMemory, ExecutionMode::MessagePassing] {
            let err = multiply(4, mode, &a, &b).unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_write_columns() {
        let mut strip = vec![0; 8];
        let tile = Tile::from_buffer(2, 2, vec![1, 2, 3, 4]).unwrap();
        write_columns(&mut strip, 4, 2, &tile);
        assert_eq!(strip, vec![0, 0, 1, 2, 0, 0, 3, 4]);
    }
}

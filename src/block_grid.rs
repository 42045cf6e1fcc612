//! 2D Cannon-style decomposition over a `side x side` worker grid.
//!
//! Worker `(i, j)` owns A-tile `(i, j)` (row block `i`, k-block `j`) and B-tile
//! `(j, i)` (k-block `j`, column block `i`). B-tiles rotate down each grid column:
//! after `t` rounds worker `(i, j)` holds B-tile `(j, (i - t) mod side)`, so over
//! `side` rounds it produces the k-block `j` contribution to every C tile in row
//! block `i`. Those contributions are added into a per-column-block partial-sum
//! tile, never overwritten.
//!
//! The partial sums of one grid row are then aggregated: in aggregation round `t`
//! the worker in grid column `(i + t) mod side` collects and sums the partial tiles
//! for its own column block from every row peer. The finished tiles are gathered
//! to rank 0 in rank order.

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::debug;

use crate::comm::Communicator;
use crate::config::{ExecutionMode, WorkerConfig};
use crate::error::Result;
use crate::matrix::Matrix;
use crate::multiplier::{run_ranks, worker_pool, Multiplier};
use crate::partition::{Dimensions, GridCoord, GridPlan};
use crate::tile::Tile;

pub struct BlockGridMultiplier {
    config: WorkerConfig,
    mode: ExecutionMode,
}

impl BlockGridMultiplier {
    pub fn new(config: WorkerConfig, mode: ExecutionMode) -> Self {
        Self { config, mode }
    }

    /// Validates the grid for `a * b` without computing anything.
    pub fn plan(&self, a: &Matrix, b: &Matrix) -> Result<GridPlan> {
        GridPlan::new(Dimensions::of(a, b)?, self.config.workers)
    }

    /// Workers read each other's B-tiles directly and aggregate into per-tile
    /// mutex-guarded accumulators.
    fn multiply_shared(&self, plan: GridPlan, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let Dimensions { m, q, .. } = plan.dimensions();
        let pool = worker_pool(plan.workers())?;
        let debug = self.config.debug;

        let workers = BlockGridWorker::scatter(plan, a, b);
        let b_tiles: Vec<&Tile> = workers.iter().map(|w| &w.b_tile).collect();
        let accumulators: Vec<Mutex<Tile>> = (0..plan.workers())
            .map(|_| Mutex::new(Tile::zeros(plan.tile_rows(), plan.tile_cols())))
            .collect();

        pool.install(|| {
            workers.par_iter().for_each(|worker| {
                let mut partials = worker.empty_partials();
                for round in 0..plan.side() {
                    let owner = plan.receive_from(worker.rank, round);
                    worker.accumulate_round(&mut partials, round, b_tiles[owner], debug);
                }

                let GridCoord { row, .. } = plan.coords(worker.rank);
                for round in 0..plan.side() {
                    let collector = plan.collector(row, round);
                    if debug {
                        debug!(rank = worker.rank, round, collector, "2d shared aggregation");
                    }
                    accumulators[plan.rank_at(row, collector)]
                        .lock()
                        .accumulate(&partials[collector]);
                }
            });
        });

        let mut result = Matrix::zeros(m, q);
        for (rank, accumulator) in accumulators.into_iter().enumerate() {
            let tile = plan.c_tile(rank);
            result.write_tile(tile.rows.start, tile.cols.start, &accumulator.into_inner());
        }
        Ok(result)
    }

    fn multiply_distributed(&self, plan: GridPlan, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let workers = BlockGridWorker::scatter(plan, a, b);
        let debug = self.config.debug;
        run_ranks(workers, |worker, endpoint| worker.run(&endpoint, debug))
    }
}

impl Multiplier for BlockGridMultiplier {
    fn name(&self) -> &'static str {
        match self.mode {
            ExecutionMode::SharedMemory => "2d-shared",
            ExecutionMode::MessagePassing => "2d-distributed",
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

/// Private state of one grid worker: its owned A-tile and B-tile.
#[derive(Clone, Debug)]
pub struct BlockGridWorker {
    rank: usize,
    plan: GridPlan,
    a_tile: Tile,
    b_tile: Tile,
}

impl BlockGridWorker {
    pub fn scatter(plan: GridPlan, a: &Matrix, b: &Matrix) -> Vec<Self> {
        (0..plan.workers())
            .map(|rank| {
                let a_range = plan.a_tile(rank);
                let b_range = plan.b_tile(rank);
                Self {
                    rank,
                    plan,
                    a_tile: a.block(a_range.rows, a_range.cols),
                    b_tile: b.block(b_range.rows, b_range.cols),
                }
            })
            .collect()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn a_tile(&self) -> &Tile {
        &self.a_tile
    }

    pub fn b_tile(&self) -> &Tile {
        &self.b_tile
    }

    fn empty_partials(&self) -> Vec<Tile> {
        let tile = Tile::zeros(self.plan.tile_rows(), self.plan.tile_cols());
        vec![tile; self.plan.side()]
    }

    /// Adds `A-tile * b_tile` into the partial sum of the column block held in `round`.
    fn accumulate_round(&self, partials: &mut [Tile], round: usize, b_tile: &Tile, debug: bool) {
        let column_block = self.plan.column_block_at(self.rank, round);
        if debug {
            debug!(rank = self.rank, round, column_block, "2d rotation round");
        }
        partials[column_block].multiply_accumulate(&self.a_tile, b_tile);
    }

    /// Rotation phase. Returns one partial-sum tile per column block of C, each
    /// covering only this worker's k-block.
    pub fn rotate<C: Communicator>(&self, comm: &C, debug: bool) -> Result<Vec<Tile>> {
        let plan = self.plan;
        let mut partials = self.empty_partials();
        let mut incoming = Tile::zeros(plan.tile_inner(), plan.tile_cols());

        for round in 0..plan.side() {
            if round == 0 {
                self.accumulate_round(&mut partials, round, &self.b_tile, debug);
                continue;
            }
            comm.send(self.b_tile.as_slice(), plan.send_to(self.rank, round))?;
            comm.receive(incoming.as_mut_slice(), plan.receive_from(self.rank, round))?;
            self.accumulate_round(&mut partials, round, &incoming, debug);
            comm.barrier()?;
        }

        Ok(partials)
    }

    /// Aggregation phase. Returns this worker's finished C tile.
    pub fn aggregate<C: Communicator>(&self, comm: &C, partials: &[Tile], debug: bool) -> Result<Tile> {
        let plan = self.plan;
        let GridCoord { row, col } = plan.coords(self.rank);
        let mut owned = Tile::zeros(plan.tile_rows(), plan.tile_cols());
        let mut incoming = owned.clone();

        for round in 0..plan.side() {
            let collector = plan.collector(row, round);
            if debug {
                debug!(rank = self.rank, round, collector, "2d aggregation round");
            }
            if collector == col {
                owned.accumulate(&partials[col]);
                for peer in (0..plan.side()).filter(|&peer| peer != col) {
                    comm.receive(incoming.as_mut_slice(), plan.rank_at(row, peer))?;
                    owned.accumulate(&incoming);
                }
            } else {
                comm.send(partials[collector].as_slice(), plan.rank_at(row, collector))?;
            }
            comm.barrier()?;
        }

        Ok(owned)
    }

    /// Runs rotation, aggregation and the gather. Returns the assembled C on rank 0.
    pub fn run<C: Communicator>(self, comm: &C, debug: bool) -> Result<Option<Matrix>> {
        let partials = self.rotate(comm, debug)?;
        let owned = self.aggregate(comm, &partials, debug)?;

        if self.rank != 0 {
            comm.send(owned.as_slice(), 0)?;
            return Ok(None);
        }

        let plan = self.plan;
        let Dimensions { m, q, .. } = plan.dimensions();
        let mut result = Matrix::zeros(m, q);
        let mut incoming = owned.clone();
        for rank in 0..plan.workers() {
            let tile = if rank == 0 {
                &owned
            } else {
                comm.receive(incoming.as_mut_slice(), rank)?;
                &incoming
            };
            let range = plan.c_tile(rank);
            result.write_tile(range.rows.start, range.cols.start, tile);
        }
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::ChannelNetwork;
    use crate::factory::MatrixFactory;
    use crate::sequential::SequentialMultiplier;
    use std::thread;

    fn multiply(workers: usize, mode: ExecutionMode, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        BlockGridMultiplier::new(WorkerConfig::new(workers).with_debug(true), mode).multiply(a, b)
    }

    const MODES: [ExecutionMode; 2] = [ExecutionMode::SharedMemory, ExecutionMode::MessagePassing];

    #[test]
    fn test_matches_sequential_square() {
        let a = MatrixFactory::generate(8, 8, 10, 21);
        let b = MatrixFactory::generate(8, 8, 10, 22);
        let expected = SequentialMultiplier::product(&a, &b).unwrap();
        for workers in [1, 4] {
            for mode in MODES {
                assert_eq!(multiply(workers, mode, &a, &b).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_matches_sequential_rectangular_nine_workers() {
        let a = MatrixFactory::generate(6, 9, 10, 31);
        let b = MatrixFactory::generate(9, 3, 10, 32);
        let expected = SequentialMultiplier::product(&a, &b).unwrap();
        for mode in MODES {
            assert_eq!(multiply(9, mode, &a, &b).unwrap(), expected);
        }
    }

    #[test]
    fn test_partial_sums_are_accumulated() {
        // Every C entry is a sum over all four k values; keeping only one rotation or
        // one aggregation contribution would leave 1 or 2 instead of 4.
        let ones = MatrixFactory::filled(4, 4, 1);
        let expected = MatrixFactory::filled(4, 4, 4);
        for mode in MODES {
            assert_eq!(multiply(4, mode, &ones, &ones).unwrap(), expected);
        }
    }

    #[test]
    fn test_ones_times_identity() {
        let a = MatrixFactory::filled(4, 4, 1);
        let id = MatrixFactory::identity(4);
        for mode in MODES {
            assert_eq!(multiply(4, mode, &a, &id).unwrap(), a);
        }
    }

    #[test]
    fn test_scatter_ownership() {
        let a = MatrixFactory::generate(4, 4, 10, 1);
        let b = MatrixFactory::generate(4, 4, 10, 2);
        let plan = GridPlan::new(Dimensions::new(4, 4, 4), 4).unwrap();
        let workers = BlockGridWorker::scatter(plan, &a, &b);

        assert_eq!(workers[0].a_tile(), &a.block(0..2, 0..2));
        assert_eq!(workers[1].rank(), 1);
        assert_eq!(workers[1].a_tile(), &a.block(0..2, 2..4));
        assert_eq!(workers[1].b_tile(), &b.block(2..4, 0..2));
    }

    #[test]
    fn test_rotation_then_aggregation_phases() {
        let a = MatrixFactory::generate(4, 6, 10, 41);
        let b = MatrixFactory::generate(6, 8, 10, 42);
        let expected = SequentialMultiplier::product(&a, &b).unwrap();
        let plan = GridPlan::new(Dimensions::new(4, 6, 8), 4).unwrap();
        let workers = BlockGridWorker::scatter(plan, &a, &b);
        let endpoints = ChannelNetwork::create(4);

        let outcomes: Vec<(Vec<Tile>, Tile)> = thread::scope(|s| {
            let handles: Vec<_> = workers
                .iter()
                .zip(endpoints)
                .map(|(worker, endpoint)| {
                    s.spawn(move || {
                        let partials = worker.rotate(&endpoint, false).unwrap();
                        let owned = worker.aggregate(&endpoint, &partials, false).unwrap();
                        (partials, owned)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (rank, (partials, owned)) in outcomes.iter().enumerate() {
            let GridCoord { row, col } = plan.coords(rank);

            // Rotation: partial for column block c is A(row, col) * B(col, c).
            for (c, partial) in partials.iter().enumerate() {
                let b_range = plan.b_tile(plan.rank_at(c, col));
                let mut direct = Tile::zeros(plan.tile_rows(), plan.tile_cols());
                direct.multiply_accumulate(workers[rank].a_tile(), &b.block(b_range.rows, b_range.cols));
                assert_eq!(partial, &direct, "rank {rank} column block {c}");
            }

            // Aggregation: owned tile is the finished C(row, col).
            let c_range = plan.c_tile(rank);
            assert_eq!(c_range.rows.start, row * plan.tile_rows());
            assert_eq!(c_range.cols.start, col * plan.tile_cols());
            assert_eq!(owned, &expected.block(c_range.rows, c_range.cols));
        }
    }

    #[test]
    fn test_rejects_non_square_worker_count() {
        let a = MatrixFactory::generate(8, 8, 10, 1);
        for mode in MODES {
            let err = multiply(2, mode, &a, &a).unwrap_err();
            assert!(err.is_configuration());
        }
    }
}

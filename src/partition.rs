//! Partition plans: which worker owns which rows, columns and tiles.
//!
//! Plans are validated once, before any work starts. Shapes that would need
//! remainder rows or columns are rejected instead of silently truncated.

use std::ops::Range;

use crate::error::{MatMulError, Result};
use crate::matrix::Matrix;

/// Shape of a product `C (m x q) = A (m x n) * B (n x q)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub m: usize,
    pub n: usize,
    pub q: usize,
}

impl Dimensions {
    pub fn new(m: usize, n: usize, q: usize) -> Self {
        Self { m, n, q }
    }

    /// Shape of `a * b`, rejecting operands whose inner dimensions differ.
    pub fn of(a: &Matrix, b: &Matrix) -> Result<Self> {
        if a.cols() != b.rows() {
            return Err(MatMulError::IncompatibleOperands {
                a_rows: a.rows(),
                a_cols: a.cols(),
                b_rows: b.rows(),
                b_cols: b.cols(),
            });
        }
        Ok(Self::new(a.rows(), a.cols(), b.cols()))
    }
}

fn check_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(MatMulError::NoWorkers);
    }
    Ok(())
}

fn check_divisible(dimension: &'static str, extent: usize, factor: usize) -> Result<()> {
    if factor > extent {
        return Err(MatMulError::WorkersExceedDimension {
            workers: factor,
            dimension,
            extent,
        });
    }
    if extent % factor != 0 {
        return Err(MatMulError::IndivisibleDimension {
            dimension,
            extent,
            factor,
        });
    }
    Ok(())
}

/// 1D plan: worker `r` owns a contiguous row block of A and a column block of B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowBlockPlan {
    dims: Dimensions,
    workers: usize,
}

impl RowBlockPlan {
    pub fn new(dims: Dimensions, workers: usize) -> Result<Self> {
        check_workers(workers)?;
        check_divisible("m", dims.m, workers)?;
        check_divisible("q", dims.q, workers)?;
        Ok(Self { dims, workers })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn rows_per_worker(&self) -> usize {
        self.dims.m / self.workers
    }

    pub fn cols_per_worker(&self) -> usize {
        self.dims.q / self.workers
    }

    /// Rows of A (and of C) owned by `rank`.
    pub fn row_range(&self, rank: usize) -> Range<usize> {
        let h = self.rows_per_worker();
        rank * h..(rank + 1) * h
    }

    /// Columns of B owned by `rank`.
    pub fn col_range(&self, rank: usize) -> Range<usize> {
        let w = self.cols_per_worker();
        rank * w..(rank + 1) * w
    }

    pub fn send_to(&self, rank: usize, round: usize) -> usize {
        (rank + round) % self.workers
    }

    pub fn receive_from(&self, rank: usize, round: usize) -> usize {
        (rank + self.workers - round % self.workers) % self.workers
    }

    /// Elements in one flattened B column block.
    pub fn column_block_len(&self) -> usize {
        self.dims.n * self.cols_per_worker()
    }

    /// Elements in one flattened C row strip.
    pub fn row_strip_len(&self) -> usize {
        self.rows_per_worker() * self.dims.q
    }
}

/// Position of a worker in the `side x side` grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

/// A rectangular region of a matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileRange {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

/// 2D plan: `P = side * side` workers, worker `(i, j)` owns A-tile `(i, j)` and
/// B-tile `(j, i)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridPlan {
    dims: Dimensions,
    side: usize,
}

impl GridPlan {
    pub fn new(dims: Dimensions, workers: usize) -> Result<Self> {
        check_workers(workers)?;
        let side = integer_sqrt(workers);
        if side * side != workers {
            return Err(MatMulError::NotPerfectSquare { workers });
        }
        check_divisible("m", dims.m, side)?;
        check_divisible("n", dims.n, side)?;
        check_divisible("q", dims.q, side)?;
        Ok(Self { dims, side })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn workers(&self) -> usize {
        self.side * self.side
    }

    pub fn coords(&self, rank: usize) -> GridCoord {
        GridCoord {
            row: rank / self.side,
            col: rank % self.side,
        }
    }

    pub fn rank_at(&self, row: usize, col: usize) -> usize {
        (row % self.side) * self.side + col % self.side
    }

    /// Tile height of A and C.
    pub fn tile_rows(&self) -> usize {
        self.dims.m / self.side
    }

    /// Tile width of A, height of B.
    pub fn tile_inner(&self) -> usize {
        self.dims.n / self.side
    }

    /// Tile width of B and C.
    pub fn tile_cols(&self) -> usize {
        self.dims.q / self.side
    }

    pub fn a_tile(&self, rank: usize) -> TileRange {
        let GridCoord { row, col } = self.coords(rank);
        let (h, w) = (self.tile_rows(), self.tile_inner());
        TileRange {
            rows: row * h..(row + 1) * h,
            cols: col * w..(col + 1) * w,
        }
    }

    pub fn b_tile(&self, rank: usize) -> TileRange {
        let GridCoord { row, col } = self.coords(rank);
        let (h, w) = (self.tile_inner(), self.tile_cols());
        TileRange {
            rows: col * h..(col + 1) * h,
            cols: row * w..(row + 1) * w,
        }
    }

    /// The C tile a worker holds after aggregation: row block `i`, column block `j`.
    pub fn c_tile(&self, rank: usize) -> TileRange {
        let GridCoord { row, col } = self.coords(rank);
        let (h, w) = (self.tile_rows(), self.tile_cols());
        TileRange {
            rows: row * h..(row + 1) * h,
            cols: col * w..(col + 1) * w,
        }
    }

    pub fn send_to(&self, rank: usize, round: usize) -> usize {
        let GridCoord { row, col } = self.coords(rank);
        self.rank_at(row + round, col)
    }

    pub fn receive_from(&self, rank: usize, round: usize) -> usize {
        let GridCoord { row, col } = self.coords(rank);
        self.rank_at(row + self.side - round % self.side, col)
    }

    /// Column block of the B-tile a worker holds after `round` rotations.
    pub fn column_block_at(&self, rank: usize, round: usize) -> usize {
        let GridCoord { row, .. } = self.coords(rank);
        (row + self.side - round % self.side) % self.side
    }

    /// Grid column of the worker collecting partial tiles for `grid_row` in
    /// aggregation `round`.
    pub fn collector(&self, grid_row: usize, round: usize) -> usize {
        (grid_row + round) % self.side
    }

    /// Elements in one flattened B-tile.
    pub fn b_tile_len(&self) -> usize {
        self.tile_inner() * self.tile_cols()
    }

    /// Elements in one flattened C tile.
    pub fn c_tile_len(&self) -> usize {
        self.tile_rows() * self.tile_cols()
    }
}

/// Floor square root. Never overflows, even for `usize::MAX`.
fn integer_sqrt(value: usize) -> usize {
    let squares_within = |root: usize| root.checked_mul(root).is_some_and(|sq| sq <= value);
    let mut root = (value as f64).sqrt() as usize;
    while !squares_within(root) {
        root -= 1;
    }
    while squares_within(root + 1) {
        root += 1;
    }
    root
}

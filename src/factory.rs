//! Test matrix generators.
//!
//! All random generators are seeded, so the same `(shape, bound, seed)` always yields
//! the same matrix regardless of how many workers later consume it.

use std::ops::RangeInclusive;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::matrix::{Element, Matrix};

/// Default exclusive upper bound for random entries.
pub const MAX_MATRIX_VALUE: Element = 10;

pub struct MatrixFactory;

impl MatrixFactory {
    /// Random `rows x cols` matrix with entries in `[0, max_exclusive)`.
    ///
    /// A bound below 1 is treated as 1, which yields an all-zero matrix.
    pub fn generate(rows: usize, cols: usize, max_exclusive: Element, seed: u64) -> Matrix {
        let bound = max_exclusive.max(1);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let data = (0..rows * cols).map(|_| rng.gen_range(0..bound)).collect();
        Matrix::from_parts(rows, cols, data)
    }

    /// Random matrix with entries drawn uniformly from `range`.
    ///
    /// An empty range collapses to its start, like the bound clamp in [`Self::generate`].
    pub fn uniform(rows: usize, cols: usize, range: RangeInclusive<Element>, seed: u64) -> Matrix {
        let (low, high) = range.into_inner();
        let range = low..=high.max(low);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let data = (0..rows * cols)
            .map(|_| rng.gen_range(range.clone()))
            .collect();
        Matrix::from_parts(rows, cols, data)
    }

    /// The `n x n` identity.
    pub fn identity(n: usize) -> Matrix {
        Self::identity_rect(n, n)
    }

    /// Ones on the main diagonal of a `rows x cols` matrix, zeros elsewhere.
    pub fn identity_rect(rows: usize, cols: usize) -> Matrix {
        let mut result = Matrix::zeros(rows, cols);
        for i in 0..rows.min(cols) {
            result.set(i, i, 1);
        }
        result
    }

    pub fn filled(rows: usize, cols: usize, value: Element) -> Matrix {
        Matrix::from_parts(rows, cols, vec![value; rows * cols])
    }
}

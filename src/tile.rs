//! Owned rectangular sub-blocks and the block product kernel shared by the
//! partitioned multipliers.

use crate::error::{MatMulError, Result};
use crate::matrix::Element;

/// A contiguous row-major sub-matrix owned by one worker.
///
/// The backing buffer doubles as the wire format: a tile is sent as its flattened
/// elements and rebuilt on the receiving side from the known shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    rows: usize,
    cols: usize,
    data: Vec<Element>,
}

impl Tile {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub(crate) fn from_parts(rows: usize, cols: usize, data: Vec<Element>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    /// Rebuilds a tile from a flattened buffer of exactly `rows * cols` elements.
    pub fn from_buffer(rows: usize, cols: usize, data: Vec<Element>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatMulError::InvalidDimension {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, row: usize) -> &[Element] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[Element] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Element] {
        &mut self.data
    }

    /// `self += a * b`. Existing contents are kept; this never overwrites.
    pub fn multiply_accumulate(&mut self, a: &Tile, b: &Tile) {
        assert_eq!(a.cols, b.rows, "inner tile dimensions differ");
        assert_eq!((self.rows, self.cols), (a.rows, b.cols), "output tile shape");
        multiply_accumulate_into(&mut self.data, b.cols, &a.data, a.cols, &b.data);
    }

    /// Element-wise `self += other`.
    pub fn accumulate(&mut self, other: &Tile) {
        assert_eq!((self.rows, self.cols), (other.rows, other.cols), "tile shape");
        for (dst, &src) in self.data.iter_mut().zip(&other.data) {
            *dst = dst.wrapping_add(src);
        }
    }
}

/// Adds the product of row-major `a` (`out.len() / out_cols` x `inner`) and
/// `b` (`inner` x `out_cols`) into `out`.
///
/// `out` may be a strided window of a wider buffer as long as it is exactly
/// `rows * out_cols` long; the i-k-j order keeps the inner loop on contiguous rows.
pub(crate) fn multiply_accumulate_into(
    out: &mut [Element],
    out_cols: usize,
    a: &[Element],
    inner: usize,
    b: &[Element],
) {
    if out_cols == 0 || inner == 0 {
        return;
    }
    for (out_row, a_row) in out.chunks_exact_mut(out_cols).zip(a.chunks_exact(inner)) {
        for (&a_ik, b_row) in a_row.iter().zip(b.chunks_exact(out_cols)) {
            for (c, &b_kj) in out_row.iter_mut().zip(b_row) {
                *c = c.wrapping_add(a_ik.wrapping_mul(b_kj));
            }
        }
    }
}

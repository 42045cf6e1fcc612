//! Dense integer matrix stored as a single row-major buffer.

use std::fmt;
use std::ops::Range;

use crate::error::{MatMulError, Result};
use crate::tile::Tile;

/// Scalar type of every matrix in this crate.
///
/// Products and sums use wrapping arithmetic, so results are identical for every
/// summation order and no variant needs overflow detection.
pub type Element = i64;

#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Element>,
}

impl Matrix {
    /// Zero-filled `rows x cols` matrix.
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

    /// Wraps a row-major buffer of exactly `rows * cols` elements.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Element>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatMulError::InvalidDimension {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from nested rows, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<Element>>) -> Result<Self> {
        if rows.is_empty() || rows[0].is_empty() {
            return Err(MatMulError::EmptyMatrix {
                rows: rows.len(),
                cols: rows.first().map_or(0, Vec::len),
            });
        }

        let cols = rows[0].len();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != cols {
                return Err(MatMulError::RaggedRows {
                    row,
                    expected: cols,
                    got: values.len(),
                });
            }
            data.extend_from_slice(values);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Element {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Element) {
        self.data[row * self.cols + col] = value;
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

    /// Copies the sub-block `rows x cols` into an owned tile.
    pub fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Tile {
        let mut data = Vec::with_capacity(rows.len() * cols.len());
        for row in rows.clone() {
            data.extend_from_slice(&self.row(row)[cols.clone()]);
        }
        Tile::from_parts(rows.len(), cols.len(), data)
    }

    /// Overwrites the region starting at `(row_offset, col_offset)` with `tile`.
    pub fn write_tile(&mut self, row_offset: usize, col_offset: usize, tile: &Tile) {
        for r in 0..tile.rows() {
            let start = (row_offset + r) * self.cols + col_offset;
            self.data[start..start + tile.cols()].copy_from_slice(tile.row(r));
        }
    }

    /// Wrapping sum of all elements, used for quick run summaries.
    pub fn checksum(&self) -> Element {
        self.data.iter().fold(0, |acc: Element, &x| acc.wrapping_add(x))
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            let line: Vec<String> = self.row(i).iter().map(ToString::to_string).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = Matrix::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(
            err,
            MatMulError::RaggedRows {
                row: 1,
                expected: 2,
                got: 1
            }
        ));
        assert!(Matrix::from_rows(vec![]).is_err());
    }

    #[test]
    fn test_block_and_write_tile() {
        let m = Matrix::from_rows(vec![
            vec![1, 2, 3, 4],
            vec![5, 6, 7, 8],
            vec![9, 10, 11, 12],
        ])
        .unwrap();

        let block = m.block(1..3, 2..4);
        assert_eq!(block.as_slice(), &[7, 8, 11, 12]);

        let mut target = Matrix::zeros(3, 4);
        target.write_tile(0, 1, &block);
        assert_eq!(target.row(0), &[0, 7, 8, 0]);
        assert_eq!(target.row(1), &[0, 11, 12, 0]);
    }

    #[test]
    fn test_checksum_and_length_check() {
        let m = Matrix::from_vec(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.checksum(), 21);
        assert!(Matrix::from_vec(2, 2, vec![1]).is_err());
    }

    #[test]
    fn test_display() {
        let m = Matrix::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(m.to_string(), "1 2\n3 4\n");
    }
}

//! Serial reference multiplication, the oracle every parallel variant is checked
//! against.

use crate::error::Result;
use crate::matrix::{Element, Matrix};
use crate::multiplier::Multiplier;
use crate::partition::Dimensions;

/// Textbook triple loop. No partitioning, no shared state.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialMultiplier;

impl SequentialMultiplier {
    pub fn product(a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let Dimensions { m, n, q } = Dimensions::of(a, b)?;
        let mut result = Matrix::zeros(m, q);

        for i in 0..m {
            for j in 0..q {
                let mut value: Element = 0;
                for k in 0..n {
                    value = value.wrapping_add(a.get(i, k).wrapping_mul(b.get(k, j)));
                }
                result.set(i, j, value);
            }
        }

        Ok(result)
    }
}

impl Multiplier for SequentialMultiplier {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        Self::product(a, b)
    }
}

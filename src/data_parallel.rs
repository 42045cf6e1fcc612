//! Data-parallel baseline: the serial algorithm with its outer row loop split
//! across the pool. No ownership, no communication.

use rayon::prelude::*;

use crate::config::WorkerConfig;
use crate::error::{MatMulError, Result};
use crate::matrix::{Element, Matrix};
use crate::multiplier::{worker_pool, Multiplier};
use crate::partition::Dimensions;

pub struct DataParallelMultiplier {
    config: WorkerConfig,
}

impl DataParallelMultiplier {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }
}

impl Multiplier for DataParallelMultiplier {
    fn name(&self) -> &'static str {
        "data-parallel"
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let Dimensions { m, n, q } = Dimensions::of(a, b)?;
        if self.config.workers == 0 {
            return Err(MatMulError::NoWorkers);
        }

        let mut result = Matrix::zeros(m, q);
        if q == 0 {
            return Ok(result);
        }

        let pool = worker_pool(self.config.workers)?;
        pool.install(|| {
            result
                .as_mut_slice()
                .par_chunks_mut(q)
                .enumerate()
                .for_each(|(i, row)| {
                    for (j, cell) in row.iter_mut().enumerate() {
                        let mut value: Element = 0;
                        for k in 0..n {
                            value = value.wrapping_add(a.get(i, k).wrapping_mul(b.get(k, j)));
                        }
                        *cell = value;
                    }
                });
        });

        Ok(result)
    }
}

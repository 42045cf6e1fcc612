//! Exact comparison of a candidate product against the oracle.

use std::fmt;

use tracing::debug;

use crate::error::{MatMulError, Result};
use crate::matrix::{Element, Matrix};

/// One differing cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub expected: Element,
    pub actual: Element,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed at [{}][{}]: answer {}, control {}",
            self.row, self.col, self.actual, self.expected
        )
    }
}

/// Outcome of a verification. A mismatch is a value, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    pub mismatches: usize,
    /// First differing cell in row-major order.
    pub first_mismatch: Option<Mismatch>,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.first_mismatch {
            None => write!(f, "Pass"),
            Some(first) => write!(f, "Fail: {} errors, first {}", self.mismatches, first),
        }
    }
}

pub struct Verifier;

impl Verifier {
    /// Counts cells where `candidate` differs from `oracle`.
    ///
    /// With `log_each` every mismatching coordinate is logged at debug level.
    pub fn verify(candidate: &Matrix, oracle: &Matrix, log_each: bool) -> Result<Verification> {
        if (candidate.rows(), candidate.cols()) != (oracle.rows(), oracle.cols()) {
            return Err(MatMulError::ShapeMismatch {
                expected_rows: oracle.rows(),
                expected_cols: oracle.cols(),
                rows: candidate.rows(),
                cols: candidate.cols(),
            });
        }

        let cols = oracle.cols().max(1);
        let mut mismatches = 0;
        let mut first_mismatch = None;

        for (index, (&actual, &expected)) in candidate
            .as_slice()
            .iter()
            .zip(oracle.as_slice())
            .enumerate()
        {
            if actual == expected {
                continue;
            }
            let mismatch = Mismatch {
                row: index / cols,
                col: index % cols,
                expected,
                actual,
            };
            if log_each {
                debug!(row = mismatch.row, col = mismatch.col, expected, actual, "mismatch");
            }
            if first_mismatch.is_none() {
                first_mismatch = Some(mismatch);
            }
            mismatches += 1;
        }

        Ok(Verification {
            mismatches,
            first_mismatch,
        })
    }
}

//! Timing values and experiment records handed to an external results sink.
//!
//! Nothing here touches the filesystem; callers decide where lines go.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::partition::Dimensions;

/// A value together with how long it took to produce.
#[derive(Clone, Debug)]
pub struct Timed<T> {
    pub label: &'static str,
    pub elapsed: Duration,
    pub value: T,
}

impl<T> Timed<T> {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Runs `f` and measures it. With `report` the elapsed time is logged under `label`.
pub fn timed<T>(label: &'static str, report: bool, f: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = f();
    let elapsed = start.elapsed();
    if report {
        info!(label, elapsed_seconds = elapsed.as_secs_f64(), "execution time");
    }
    Timed {
        label,
        elapsed,
        value,
    }
}

/// One row of a batch experiment.
#[derive(Clone, Debug, PartialEq)]
pub struct RunRecord {
    pub dimensions: Dimensions,
    pub variant: &'static str,
    pub workers: usize,
    pub elapsed_seconds: f64,
    pub errors: usize,
}

impl RunRecord {
    pub const HEADER: [&'static str; 7] = ["m", "n", "q", "variant", "workers", "seconds", "errors"];

    pub fn header(separator: &str) -> String {
        Self::HEADER.join(separator)
    }

    /// Renders the record as one delimited line without a trailing newline.
    pub fn to_delimited(&self, separator: &str) -> String {
        let Dimensions { m, n, q } = self.dimensions;
        [
            m.to_string(),
            n.to_string(),
            q.to_string(),
            self.variant.to_string(),
            self.workers.to_string(),
            format!("{:.6}", self.elapsed_seconds),
            self.errors.to_string(),
        ]
        .join(separator)
    }
}

impl fmt::Display for RunRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_returns_value() {
        let result = timed("square", false, || 7 * 7);
        assert_eq!(result.value, 49);
        assert_eq!(result.label, "square");
        assert!(result.elapsed_seconds() >= 0.0);
    }

    #[test]
    fn test_delimited_record() {
        let record = RunRecord {
            dimensions: Dimensions::new(8, 4, 2),
            variant: "1d-shared",
            workers: 2,
            elapsed_seconds: 0.5,
            errors: 0,
        };
        assert_eq!(record.to_delimited("\t"), "8\t4\t2\t1d-shared\t2\t0.500000\t0");
        assert_eq!(record.to_string(), "8,4,2,1d-shared,2,0.500000,0");
        assert_eq!(RunRecord::header(","), "m,n,q,variant,workers,seconds,errors");
    }
}

//! Run configuration passed explicitly into every multiplier and the orchestrator.

use crate::factory::MAX_MATRIX_VALUE;
use crate::matrix::Element;
use crate::partition::Dimensions;

/// Per-invocation settings shared by all multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Number of workers P.
    pub workers: usize,
    /// Log elapsed time for each timed step.
    pub report_timing: bool,
    /// Log per-round worker activity and every verification mismatch.
    pub debug: bool,
}

impl WorkerConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn with_timing(mut self, report_timing: bool) -> Self {
        self.report_timing = report_timing;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            report_timing: true,
            debug: false,
        }
    }
}

/// How partitioned workers exchange data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Workers share read access to A and B and write into one result matrix.
    SharedMemory,
    /// Workers hold private partitions and move data only through a communicator.
    MessagePassing,
}

/// The multiplication strategies the orchestrator can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    DataParallel,
    RowBlock(ExecutionMode),
    BlockGrid(ExecutionMode),
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::DataParallel,
        Variant::RowBlock(ExecutionMode::SharedMemory),
        Variant::RowBlock(ExecutionMode::MessagePassing),
        Variant::BlockGrid(ExecutionMode::SharedMemory),
        Variant::BlockGrid(ExecutionMode::MessagePassing),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Variant::DataParallel => "data-parallel",
            Variant::RowBlock(ExecutionMode::SharedMemory) => "1d-shared",
            Variant::RowBlock(ExecutionMode::MessagePassing) => "1d-distributed",
            Variant::BlockGrid(ExecutionMode::SharedMemory) => "2d-shared",
            Variant::BlockGrid(ExecutionMode::MessagePassing) => "2d-distributed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.label() == label)
    }
}

/// Settings for one orchestrated experiment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExperimentConfig {
    pub dimensions: Dimensions,
    pub workers: usize,
    pub seed: u64,
    /// Exclusive upper bound for generated entries.
    pub max_value: Element,
    pub variants: Vec<Variant>,
    pub report_timing: bool,
    pub debug: bool,
}

impl ExperimentConfig {
    pub fn new(dimensions: Dimensions, workers: usize) -> Self {
        Self {
            dimensions,
            workers,
            ..Self::default()
        }
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            workers: self.workers,
            report_timing: self.report_timing,
            debug: self.debug,
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::new(16, 16, 16),
            workers: 4,
            seed: 0x5eed,
            max_value: MAX_MATRIX_VALUE,
            variants: Variant::ALL.to_vec(),
            report_timing: true,
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_labels_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_label(variant.label()), Some(variant));
        }
        assert_eq!(Variant::from_label("3d"), None);
    }

    #[test]
    fn test_worker_config_from_experiment() {
        let cfg = ExperimentConfig::new(Dimensions::new(8, 4, 8), 2);
        let wc = cfg.worker_config();
        assert_eq!(wc.workers, 2);
        assert_eq!(wc, WorkerConfig::new(2));
    }
}

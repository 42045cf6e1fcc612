//! Wires generation, the oracle, every selected variant and verification together.

use tracing::{info, warn};

use crate::config::{ExperimentConfig, Variant};
use crate::error::{MatMulError, Result};
use crate::factory::MatrixFactory;
use crate::matrix::{Element, Matrix};
use crate::multiplier::for_variant;
use crate::partition::{Dimensions, GridPlan, RowBlockPlan};
use crate::report::{timed, RunRecord};
use crate::sequential::SequentialMultiplier;
use crate::verify::{Verification, Verifier};

/// Result of one variant against the oracle.
#[derive(Clone, Debug)]
pub struct VariantOutcome {
    pub variant: Variant,
    pub verification: Verification,
    pub record: RunRecord,
}

#[derive(Clone, Debug)]
pub struct ExperimentReport {
    pub dimensions: Dimensions,
    pub oracle_seconds: f64,
    pub oracle_checksum: Element,
    pub outcomes: Vec<VariantOutcome>,
}

impl ExperimentReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.verification.passed())
    }

    /// Records for every run, the oracle first.
    pub fn records(&self, workers: usize) -> Vec<RunRecord> {
        let oracle = RunRecord {
            dimensions: self.dimensions,
            variant: "sequential",
            workers,
            elapsed_seconds: self.oracle_seconds,
            errors: 0,
        };
        std::iter::once(oracle)
            .chain(self.outcomes.iter().map(|o| o.record.clone()))
            .collect()
    }
}

pub struct Orchestrator {
    config: ExperimentConfig,
}

impl Orchestrator {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Checks every selected variant's partition before anything is computed.
    pub fn validate(&self) -> Result<()> {
        let dims = self.config.dimensions;
        let workers = self.config.workers;
        for variant in &self.config.variants {
            match variant {
                Variant::DataParallel if workers == 0 => return Err(MatMulError::NoWorkers),
                Variant::DataParallel => {}
                Variant::RowBlock(_) => {
                    RowBlockPlan::new(dims, workers)?;
                }
                Variant::BlockGrid(_) => {
                    GridPlan::new(dims, workers)?;
                }
            }
        }
        Ok(())
    }

    /// Generates A and B from the configured seed. B uses the next seed.
    pub fn generate_inputs(&self) -> (Matrix, Matrix) {
        let Dimensions { m, n, q } = self.config.dimensions;
        let a = MatrixFactory::generate(m, n, self.config.max_value, self.config.seed);
        let b = MatrixFactory::generate(n, q, self.config.max_value, self.config.seed.wrapping_add(1));
        (a, b)
    }

    pub fn run(&self) -> Result<ExperimentReport> {
        self.validate()?;
        let (a, b) = self.generate_inputs();
        self.run_with(&a, &b)
    }

    /// Runs the oracle and every configured variant on the given inputs.
    pub fn run_with(&self, a: &Matrix, b: &Matrix) -> Result<ExperimentReport> {
        let dimensions = Dimensions::of(a, b)?;
        if dimensions != self.config.dimensions {
            self.with_dimensions(dimensions).validate()?;
        } else {
            self.validate()?;
        }

        let report_timing = self.config.report_timing;
        let oracle = timed("sequential", report_timing, || SequentialMultiplier::product(a, b));
        let oracle_seconds = oracle.elapsed_seconds();
        let oracle_matrix = oracle.value?;

        let worker_config = self.config.worker_config();
        let mut outcomes = Vec::with_capacity(self.config.variants.len());
        for &variant in &self.config.variants {
            let multiplier = for_variant(variant, worker_config);
            let run = timed(variant.label(), report_timing, || multiplier.multiply(a, b));
            let elapsed_seconds = run.elapsed_seconds();
            let product = run.value?;

            let verification = Verifier::verify(&product, &oracle_matrix, self.config.debug)?;
            if verification.passed() {
                info!(variant = variant.label(), "verification passed");
            } else {
                warn!(
                    variant = variant.label(),
                    errors = verification.mismatches,
                    first = ?verification.first_mismatch,
                    "verification failed"
                );
            }

            outcomes.push(VariantOutcome {
                variant,
                record: RunRecord {
                    dimensions,
                    variant: variant.label(),
                    workers: self.config.workers,
                    elapsed_seconds,
                    errors: verification.mismatches,
                },
                verification,
            });
        }

        Ok(ExperimentReport {
            dimensions,
            oracle_seconds,
            oracle_checksum: oracle_matrix.checksum(),
            outcomes,
        })
    }

    fn with_dimensions(&self, dimensions: Dimensions) -> Self {
        Self::new(ExperimentConfig {
            dimensions,
            ..self.config.clone()
        })
    }
}

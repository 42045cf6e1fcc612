//! Cross-variant equivalence with the serial oracle.

use proptest::prelude::*;

use crate::config::{ExecutionMode, Variant, WorkerConfig};
use crate::factory::MatrixFactory;
use crate::multiplier::{for_variant, Multiplier};
use crate::partition::{Dimensions, GridPlan, RowBlockPlan};
use crate::sequential::SequentialMultiplier;
use crate::{multiply_and_verify, BlockGridMultiplier, RowBlockMultiplier};

const MODES: [ExecutionMode; 2] = [ExecutionMode::SharedMemory, ExecutionMode::MessagePassing];

fn quiet(workers: usize) -> WorkerConfig {
    WorkerConfig::new(workers).with_timing(false)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn row_block_matches_oracle(
        workers in prop::sample::select(vec![1usize, 2, 4]),
        rows_each in 1usize..4,
        n in 1usize..6,
        cols_each in 1usize..4,
        seed in any::<u64>(),
    ) {
        let (m, q) = (workers * rows_each, workers * cols_each);
        let a = MatrixFactory::generate(m, n, 10, seed);
        let b = MatrixFactory::generate(n, q, 10, seed.wrapping_add(1));
        let expected = SequentialMultiplier::product(&a, &b).unwrap();

        for mode in MODES {
            let c = RowBlockMultiplier::new(quiet(workers), mode).multiply(&a, &b).unwrap();
            prop_assert_eq!(&c, &expected);
        }
    }

    #[test]
    fn block_grid_matches_oracle(
        side in 1usize..4,
        m_each in 1usize..3,
        n_each in 1usize..3,
        q_each in 1usize..3,
        seed in any::<u64>(),
    ) {
        let a = MatrixFactory::generate(side * m_each, side * n_each, 10, seed);
        let b = MatrixFactory::generate(side * n_each, side * q_each, 10, seed ^ 0xb);
        let expected = SequentialMultiplier::product(&a, &b).unwrap();

        for mode in MODES {
            let c = BlockGridMultiplier::new(quiet(side * side), mode).multiply(&a, &b).unwrap();
            prop_assert_eq!(&c, &expected);
        }
    }

    #[test]
    fn data_parallel_matches_oracle(
        workers in 1usize..9,
        m in 1usize..8,
        n in 1usize..8,
        q in 1usize..8,
        seed in any::<u64>(),
    ) {
        let a = MatrixFactory::generate(m, n, 10, seed);
        let b = MatrixFactory::generate(n, q, 10, seed.wrapping_mul(3));
        let (_, verification) = multiply_and_verify(Variant::DataParallel, quiet(workers), &a, &b).unwrap();
        prop_assert!(verification.passed());
    }
}

#[test]
fn identity_is_neutral_for_every_variant() {
    let a = MatrixFactory::generate(8, 8, 10, 5);
    let id = MatrixFactory::identity(8);
    for variant in Variant::ALL {
        let c = for_variant(variant, quiet(4)).multiply(&a, &id).unwrap();
        assert_eq!(c, a, "{}", variant.label());
    }
}

#[test]
fn identity_is_neutral_for_rectangular_inputs() {
    let a = MatrixFactory::generate(8, 4, 10, 6);
    let id = MatrixFactory::identity(4);
    for variant in Variant::ALL {
        let c = for_variant(variant, quiet(4)).multiply(&a, &id).unwrap();
        assert_eq!(c, a, "{}", variant.label());
    }
}

#[test]
fn ones_times_identity_scenario() {
    let ones = MatrixFactory::filled(4, 4, 1);
    let id = MatrixFactory::identity(4);

    for mode in MODES {
        let (c, verification) = multiply_and_verify(Variant::RowBlock(mode), quiet(2), &ones, &id).unwrap();
        assert!(verification.passed());
        assert_eq!(c, ones);

        let (c, verification) = multiply_and_verify(Variant::BlockGrid(mode), quiet(4), &ones, &id).unwrap();
        assert!(verification.passed());
        assert_eq!(c, ones);
    }

    let dims = Dimensions::new(4, 4, 4);
    let row_plan = RowBlockPlan::new(dims, 2).unwrap();
    assert_eq!(row_plan.row_range(0), 0..2);
    assert_eq!(row_plan.row_range(1), 2..4);

    let grid_plan = GridPlan::new(dims, 4).unwrap();
    let tile = grid_plan.a_tile(0);
    assert_eq!((tile.rows, tile.cols), (0..2, 0..2));
}

#[test]
fn more_workers_than_rows_is_a_configuration_error() {
    let a = MatrixFactory::generate(2, 4, 10, 1);
    let b = MatrixFactory::generate(4, 4, 10, 2);
    for mode in MODES {
        let err = for_variant(Variant::RowBlock(mode), quiet(4))
            .multiply(&a, &b)
            .unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }
}

#[test]
fn uneven_split_is_rejected_not_truncated() {
    // q = 5 does not split over 2 workers; the legacy behaviour dropped a column.
    let a = MatrixFactory::generate(4, 3, 10, 1);
    let b = MatrixFactory::generate(3, 5, 10, 2);
    let err = RowBlockMultiplier::new(quiet(2), ExecutionMode::SharedMemory)
        .multiply(&a, &b)
        .unwrap_err();
    assert!(err.is_configuration());
}

//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - A small base task (4-wide input, 8-wide body, 3 classes)
//! - Seeded configs so expansions are reproducible
//! - Label stores and membership matrices for the "rare" slice

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use slicekit::config::Config;
use slicekit::core::{InputRef, Linear, ModulePool, ModuleRef, Operation, Scorer, Task};
use slicekit::slicing::{LabelStore, SliceMembership};

pub const BASE_TASK: &str = "task";
pub const INPUT_KEY: &str = "x";
pub const INPUT_WIDTH: usize = 4;
pub const NECK: usize = 8;
pub const CLASSES: usize = 3;

/// Base task `x(4) -> body(8) -> head(3)` with seeded weights.
pub fn base_task() -> Task {
    base_task_named(BASE_TASK)
}

pub fn base_task_named(name: &str) -> Task {
    let mut rng = StdRng::seed_from_u64(42);
    let body: ModuleRef = Arc::new(Linear::with_rng(INPUT_WIDTH, NECK, &mut rng));
    let head: ModuleRef = Arc::new(Linear::with_rng(NECK, CLASSES, &mut rng));
    let pool: ModulePool = vec![
        (format!("{}_body", name), body),
        (format!("{}_head", name), head),
    ]
    .into_iter()
    .collect();

    let body_op = Operation::new(format!("{}_body", name), vec![InputRef::external(INPUT_KEY)]);
    let head_op = Operation::new(format!("{}_head", name), vec![body_op.output(0)]);
    Task::new(name, pool, vec![body_op, head_op], Scorer::new(["accuracy"]))
        .with_head(format!("{}_head", name))
}

pub fn seeded_config() -> Config {
    Config {
        seed: Some(7),
        ..Config::default()
    }
}

pub fn example_input() -> HashMap<String, Array1<f32>> {
    let mut inputs = HashMap::new();
    inputs.insert(INPUT_KEY.to_string(), array![0.5f32, -1.0, 0.25, 2.0]);
    inputs
}

/// Labels `[1, 2, 1]` for the base task.
pub fn label_store() -> LabelStore {
    let mut store = LabelStore::new();
    store.insert(BASE_TASK, array![1i64, 2, 1]);
    store
}

/// Examples 0 and 2 are in the "rare" slice.
pub fn rare_membership() -> SliceMembership {
    let matrix: Array2<u8> = array![[1], [0], [1]];
    SliceMembership::from_dense(matrix, vec!["rare".to_string()])
}

//! End-to-end slice pipeline tests.
//!
//! Labels are materialized and the base task expanded exactly as a
//! training pipeline would before building its model; the resulting
//! model is then executed on a single example.

use std::sync::Arc;

use ndarray::array;

use slicekit::core::{Module, MultitaskModel};
use slicekit::slicing::{
    add_slice_labels, convert_to_slice_tasks, SliceRole, SliceTaskName, IN_SLICE, OUT_OF_SLICE,
};
use slicekit::Error;

use crate::fixtures::{
    base_task, example_input, label_store, rare_membership, seeded_config, BASE_TASK, CLASSES,
};

/// Test: labels and tasks line up
/// Given the "rare" slice over three examples
/// When labels are materialized and the task expanded
/// Then every slice task has a label array of its own name
#[test]
fn test_every_slice_task_has_labels() {
    let mut store = label_store();
    add_slice_labels(&mut store, BASE_TASK, rare_membership()).unwrap();
    let tasks = convert_to_slice_tasks(&base_task(), &["rare"], &seeded_config()).unwrap();

    for task in &tasks {
        assert!(
            store.contains(&task.name),
            "No labels registered for {}",
            task.name
        );
    }
    // 2 slices * (ind + pred) + the base entry itself
    assert_eq!(store.len(), 5);
}

#[test]
fn test_rare_slice_labels() {
    let mut store = label_store();
    let slices = add_slice_labels(&mut store, BASE_TASK, rare_membership()).unwrap();

    assert_eq!(slices, vec!["rare".to_string(), "base".to_string()]);
    assert_eq!(store.get("task_slice:rare_pred"), Some(&array![1i64, 0, 1]));
    assert_eq!(
        store.get("task_slice:rare_ind"),
        Some(&array![IN_SLICE, OUT_OF_SLICE, IN_SLICE])
    );
    assert_eq!(store.get("task_slice:base_pred"), Some(&array![1i64, 2, 1]));
    assert_eq!(store.get("task_slice:base_ind"), Some(&array![1i64, 1, 1]));
}

/// Test: full forward pass
/// Given an expanded task list bound into one model
/// When each task runs on one example
/// Then indicator tasks emit 2 logits and the rest emit one per class
#[test]
fn test_expanded_model_forward_shapes() {
    let tasks = convert_to_slice_tasks(&base_task(), &["rare"], &seeded_config()).unwrap();
    let model = MultitaskModel::new(tasks).unwrap();
    let inputs = example_input();

    for task in model.tasks() {
        let out = model.forward(&task.name, &inputs).unwrap();
        let expected = match SliceTaskName::parse(&task.name).map(|n| n.role) {
            Some(SliceRole::Indicator) => 2,
            _ => CLASSES,
        };
        assert_eq!(out.len(), expected, "Wrong output width for {}", task.name);
        assert!(out.iter().all(|v| v.is_finite()));
    }
}

/// Test: base-only expansion
/// Given no user slices
/// When the master task runs
/// Then its output is the original head applied to the base slice representation
#[test]
fn test_base_only_master_matches_manual_composition() {
    let base = base_task();
    let tasks = convert_to_slice_tasks(&base, &[] as &[&str], &seeded_config()).unwrap();
    assert_eq!(tasks.len(), 3);
    let model = MultitaskModel::new(tasks).unwrap();
    let inputs = example_input();

    let body = model.module("task_body").unwrap();
    let transform = model.module("task_slice:base_pred_transform").unwrap();
    let head = base.module_pool.get("task_head").unwrap();

    let body_out = body.forward(&[&inputs["x"]]).unwrap().remove(0);
    let rep = transform.forward(&[&body_out]).unwrap().remove(0);
    let expected = head.forward(&[&rep]).unwrap().remove(0);

    let actual = model.forward(BASE_TASK, &inputs).unwrap();
    assert!(
        (&actual - &expected).iter().all(|d| d.abs() < 1e-5),
        "master output {:?} != {:?}",
        actual,
        expected
    );
}

#[test]
fn test_model_shares_predictor_head_weights() {
    let tasks = convert_to_slice_tasks(&base_task(), &["rare", "night"], &seeded_config()).unwrap();
    let model = MultitaskModel::new(tasks).unwrap();

    let rare = model.module("task_slice:rare_pred_head").unwrap();
    for slice in ["night", "base"] {
        let name = SliceTaskName::predictor(BASE_TASK, slice).head_module_name();
        assert!(Arc::ptr_eq(model.module(&name).unwrap(), rare));
    }
    assert!(!Arc::ptr_eq(
        model.module("task_slice:rare_pred_transform").unwrap(),
        model.module("task_slice:night_pred_transform").unwrap()
    ));
}

#[test]
fn test_master_reuses_original_head() {
    let base = base_task();
    let tasks = convert_to_slice_tasks(&base, &["rare"], &seeded_config()).unwrap();
    let model = MultitaskModel::new(tasks).unwrap();

    assert!(Arc::ptr_eq(
        model.module("task_master_head").unwrap(),
        base.module_pool.get("task_head").unwrap()
    ));
    // The original head operation no longer appears in any flow.
    assert!(model
        .tasks()
        .iter()
        .all(|t| t.task_flow.iter().all(|op| op.module_name != "task_head")));
}

#[test]
fn test_base_task_is_untouched_by_expansion() {
    let base = base_task();
    let before: Vec<_> = base.task_flow.iter().map(|op| op.name.clone()).collect();
    convert_to_slice_tasks(&base, &["rare"], &seeded_config()).unwrap();

    let after: Vec<_> = base.task_flow.iter().map(|op| op.name.clone()).collect();
    assert_eq!(before, after);
    assert_eq!(base.module_pool.len(), 2);
    assert!(base.module_pool.contains("task_head"));
}

#[test]
fn test_failed_label_materialization_leaves_store_alone() {
    let mut store = label_store();
    let result = add_slice_labels(&mut store, "unknown", rare_membership());

    assert!(matches!(result, Err(Error::LabelsNotFound(_))));
    assert_eq!(store, label_store());
}

#[test]
fn test_master_task_cannot_be_expanded_again() {
    let tasks = convert_to_slice_tasks(&base_task(), &["rare"], &seeded_config()).unwrap();
    let master = tasks.last().unwrap();
    assert!(matches!(
        convert_to_slice_tasks(master, &["rare"], &seeded_config()),
        Err(Error::AlreadyExpanded(_))
    ));
}

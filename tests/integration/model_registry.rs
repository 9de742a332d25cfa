//! Multitask model registry tests.
//!
//! Task pools are merged by module name; these tests cover several base
//! tasks expanded side by side and the validation performed on binding.

use std::sync::Arc;

use slicekit::core::{
    InputRef, Linear, ModulePool, ModuleRef, MultitaskModel, Operation, Scorer, Task,
};
use slicekit::slicing::convert_to_slice_tasks;
use slicekit::Error;

use crate::fixtures::{base_task, base_task_named, example_input, seeded_config};

#[test]
fn test_two_expanded_tasks_bind_into_one_model() {
    let config = seeded_config();
    let mut tasks = convert_to_slice_tasks(&base_task_named("weather"), &["rare"], &config).unwrap();
    tasks.extend(convert_to_slice_tasks(&base_task_named("traffic"), &["night"], &config).unwrap());

    let model = MultitaskModel::new(tasks).unwrap();
    assert_eq!(model.tasks().len(), 10);
    assert!(model.task("weather").is_some());
    assert!(model.task("traffic_slice:night_pred").is_some());

    let inputs = example_input();
    assert_eq!(model.forward("weather", &inputs).unwrap().len(), 3);
    assert_eq!(model.forward("traffic", &inputs).unwrap().len(), 3);
}

#[test]
fn test_master_alone_cannot_bind() {
    // Without its sibling tasks, the master flow references unknown modules.
    let tasks = convert_to_slice_tasks(&base_task(), &["rare"], &seeded_config()).unwrap();
    let master = tasks.into_iter().last().unwrap();
    assert!(matches!(
        MultitaskModel::new(vec![master]),
        Err(Error::ModuleNotFound(_))
    ));
}

#[test]
fn test_conflicting_module_names_rejected() {
    let make = |task: &str| {
        let module: ModuleRef = Arc::new(Linear::new(4, 3));
        let pool: ModulePool = vec![("shared", module)].into_iter().collect();
        let op = Operation::new("shared", vec![InputRef::external("x")]);
        Task::new(task, pool, vec![op], Scorer::default())
    };

    assert!(matches!(
        MultitaskModel::new(vec![make("a"), make("b")]),
        Err(Error::ModuleConflict(name)) if name == "shared"
    ));
}

#[test]
fn test_duplicate_task_names_rejected() {
    assert!(matches!(
        MultitaskModel::new(vec![base_task(), base_task()]),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_forward_unknown_task() {
    let model = MultitaskModel::new(vec![base_task()]).unwrap();
    assert!(matches!(
        model.forward("missing", &example_input()),
        Err(Error::TaskNotFound(_))
    ));
}

#[test]
fn test_forward_missing_external_input() {
    let model = MultitaskModel::new(vec![base_task()]).unwrap();
    assert!(model.forward("task", &Default::default()).is_err());
}

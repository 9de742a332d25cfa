//! Property tests for slice label and expansion invariants.

use ndarray::{Array1, Array2};
use proptest::prelude::*;

use slicekit::slicing::{
    add_slice_labels, convert_to_slice_tasks, LabelStore, SliceMembership, SliceTaskName,
    BASE_SLICE, IN_SLICE, OUT_OF_SLICE,
};

use crate::fixtures::{base_task, seeded_config, BASE_TASK};

/// Membership matrix (examples x slices) and base labels of matching length.
fn arb_labelled_membership() -> impl Strategy<Value = (Array2<u8>, Array1<i64>)> {
    (1usize..16, 0usize..4).prop_flat_map(|(examples, slices)| {
        (
            prop::collection::vec(0u8..2, examples * slices),
            prop::collection::vec(1i64..6, examples),
        )
            .prop_map(move |(cells, labels)| {
                let matrix = Array2::from_shape_vec((examples, slices), cells)
                    .expect("cell count matches shape");
                (matrix, Array1::from(labels))
            })
    })
}

fn slice_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("s{}", i)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Predictor labels are membership times base labels; indicator labels
    /// are IN_SLICE exactly where membership is 1.
    #[test]
    fn slice_labels_follow_membership((matrix, labels) in arb_labelled_membership()) {
        let names = slice_names(matrix.ncols());
        let mut store = LabelStore::new();
        store.insert(BASE_TASK, labels.clone());

        let slices = add_slice_labels(
            &mut store,
            BASE_TASK,
            SliceMembership::from_dense(matrix.clone(), names.clone()),
        ).unwrap();
        prop_assert_eq!(slices.len(), names.len() + 1);
        prop_assert_eq!(store.len(), 1 + 2 * slices.len());

        for (j, name) in names.iter().enumerate() {
            let pred = store.get(&SliceTaskName::predictor(BASE_TASK, name).to_string()).unwrap();
            let ind = store.get(&SliceTaskName::indicator(BASE_TASK, name).to_string()).unwrap();
            for i in 0..labels.len() {
                let member = matrix[[i, j]] == 1;
                prop_assert_eq!(pred[i], if member { labels[i] } else { 0 });
                prop_assert_eq!(ind[i], if member { IN_SLICE } else { OUT_OF_SLICE });
            }
        }
    }

    /// The base slice covers every example and reproduces the base labels.
    #[test]
    fn base_slice_labels_cover_everything((matrix, labels) in arb_labelled_membership()) {
        let names = slice_names(matrix.ncols());
        let mut store = LabelStore::new();
        store.insert(BASE_TASK, labels.clone());
        add_slice_labels(&mut store, BASE_TASK, SliceMembership::from_dense(matrix, names)).unwrap();

        let base_pred = store.get(&SliceTaskName::predictor(BASE_TASK, BASE_SLICE).to_string());
        let base_ind = store.get(&SliceTaskName::indicator(BASE_TASK, BASE_SLICE).to_string());
        prop_assert_eq!(base_pred, Some(&labels));
        prop_assert!(base_ind.unwrap().iter().all(|&v| v == IN_SLICE));
        prop_assert_eq!(store.get(BASE_TASK), Some(&labels));
    }

    /// Indicator labels do not depend on the base labels.
    #[test]
    fn indicator_labels_ignore_base_labels(
        (matrix, labels) in arb_labelled_membership(),
        shift in 1i64..4,
    ) {
        let names = slice_names(matrix.ncols());
        let run = |labels: Array1<i64>| {
            let mut store = LabelStore::new();
            store.insert(BASE_TASK, labels);
            add_slice_labels(
                &mut store,
                BASE_TASK,
                SliceMembership::from_dense(matrix.clone(), names.clone()),
            ).unwrap();
            store
        };

        let a = run(labels.clone());
        let b = run(labels.mapv(|v| v + shift));
        for name in &names {
            let key = SliceTaskName::indicator(BASE_TASK, name).to_string();
            prop_assert_eq!(a.get(&key), b.get(&key));
        }
    }

    /// Task counts and flow lengths for any set of distinct slice names.
    #[test]
    fn expansion_shape(names in prop::collection::btree_set("[a-z]{1,6}", 0..5)) {
        let names: Vec<String> = names.into_iter().collect();
        let n = if names.iter().any(|s| s == BASE_SLICE) { names.len() } else { names.len() + 1 };
        let base = base_task();
        let body = base.flow_len() - 1;

        let tasks = convert_to_slice_tasks(&base, &names, &seeded_config()).unwrap();
        prop_assert_eq!(tasks.len(), 2 * n + 1);

        for task in &tasks[..n] {
            prop_assert!(task.name.ends_with("_ind"));
            prop_assert_eq!(task.flow_len(), body + 1);
        }
        for task in &tasks[n..2 * n] {
            prop_assert!(task.name.ends_with("_pred"));
            prop_assert_eq!(task.flow_len(), body + 2);
        }
        let master = &tasks[2 * n];
        prop_assert_eq!(master.name.as_str(), BASE_TASK);
        prop_assert_eq!(master.flow_len(), body + 3 * n + 2);
        prop_assert_eq!(
            master.operation("task_master_combiner").map(|op| op.inputs.len()),
            Some(3 * n)
        );
    }

    /// The base slice is present exactly once after expansion.
    #[test]
    fn base_slice_appears_once(names in prop::collection::btree_set("[a-z]{1,6}", 0..5)) {
        let names: Vec<String> = names.into_iter().collect();
        let tasks = convert_to_slice_tasks(&base_task(), &names, &seeded_config()).unwrap();
        let base_indicator = SliceTaskName::indicator(BASE_TASK, BASE_SLICE).to_string();
        prop_assert_eq!(tasks.iter().filter(|t| t.name == base_indicator).count(), 1);
    }
}

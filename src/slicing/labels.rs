//! Slice label materialization.
//!
//! For every slice two label arrays are registered next to the base task's
//! labels: indicator labels (categorical in/out of slice) and predictor
//! labels (the base label for members, the ignore sentinel otherwise).

use crate::error::{Error, Result};
use crate::slicing::membership::SliceMembership;
use crate::slicing::naming::{ensure_unique, SliceTaskName};
use crate::{sklog, sklog_debug};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label value meaning "exclude this example from the loss".
pub const IGNORE_LABEL: i64 = 0;
/// Categorical indicator label for slice members.
pub const IN_SLICE: i64 = 1;
/// Categorical indicator label for non-members.
pub const OUT_OF_SLICE: i64 = 2;

/// Per-task label arrays, indexed by example.
///
/// Serializes as a plain JSON object of integer lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<i64>>", into = "BTreeMap<String, Vec<i64>>")]
pub struct LabelStore {
    labels: BTreeMap<String, Array1<i64>>,
}

impl From<BTreeMap<String, Vec<i64>>> for LabelStore {
    fn from(raw: BTreeMap<String, Vec<i64>>) -> Self {
        Self {
            labels: raw
                .into_iter()
                .map(|(task, labels)| (task, Array1::from(labels)))
                .collect(),
        }
    }
}

impl From<LabelStore> for BTreeMap<String, Vec<i64>> {
    fn from(store: LabelStore) -> Self {
        store
            .labels
            .into_iter()
            .map(|(task, labels)| (task, labels.to_vec()))
            .collect()
    }
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: impl Into<String>, labels: Array1<i64>) -> Option<Array1<i64>> {
        self.labels.insert(task.into(), labels)
    }

    pub fn get(&self, task: &str) -> Option<&Array1<i64>> {
        self.labels.get(task)
    }

    pub fn contains(&self, task: &str) -> bool {
        self.labels.contains_key(task)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }
}

/// Recode `{0, 1}` membership as categorical indicator labels.
pub fn indicator_labels(membership: ArrayView1<'_, u8>) -> Array1<i64> {
    membership.mapv(|m| if m == 1 { IN_SLICE } else { OUT_OF_SLICE })
}

/// Elementwise `membership * base_labels`.
pub fn predictor_labels(membership: ArrayView1<'_, u8>, base_labels: &Array1<i64>) -> Array1<i64> {
    membership.mapv(i64::from) * base_labels
}

/// Register indicator and predictor labels for every slice of `membership`.
///
/// The base slice is added if absent. Every precondition is checked before
/// the store is touched, so a failure leaves it unchanged. Existing entries,
/// the base task's included, are never removed.
pub fn add_slice_labels(
    store: &mut LabelStore,
    base_task: &str,
    membership: SliceMembership,
) -> Result<Vec<String>> {
    let membership = membership.with_base_slice()?;
    ensure_unique(membership.names())?;
    membership.ensure_binary()?;

    let base_labels = store
        .get(base_task)
        .ok_or_else(|| Error::LabelsNotFound(base_task.to_string()))?
        .clone();
    if base_labels.len() != membership.num_examples() {
        return Err(Error::ShapeMismatch {
            context: format!("labels of {}", base_task),
            expected: membership.num_examples(),
            found: base_labels.len(),
        });
    }

    for (i, slice) in membership.names().iter().enumerate() {
        let column = membership.column(i);
        let ind = indicator_labels(column);
        let pred = predictor_labels(column, &base_labels);

        sklog_debug!(
            "add_slice_labels: slice={} members={}",
            slice,
            column.iter().filter(|&&m| m == 1).count()
        );

        store.insert(SliceTaskName::indicator(base_task, slice).to_string(), ind);
        store.insert(SliceTaskName::predictor(base_task, slice).to_string(), pred);
    }

    sklog!(
        "Materialized slice labels for {}: {} slices over {} examples",
        base_task,
        membership.num_slices(),
        membership.num_examples()
    );

    Ok(membership.names().to_vec())
}

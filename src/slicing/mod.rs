//! Slice-aware task construction.
//!
//! Two steps run once per base task at pipeline construction time:
//! [`labels::add_slice_labels`] registers indicator and predictor labels
//! for every slice, and [`expander::SliceExpander`] rewrites the task into
//! indicator, predictor and master tasks sharing the base task's body.

pub mod combiner;
pub mod expander;
pub mod labels;
pub mod membership;
pub mod naming;

pub use combiner::{SliceCombiner, SliceInputs};
pub use expander::{convert_to_slice_tasks, BaseTask, SliceExpander};
pub use labels::{add_slice_labels, LabelStore, IGNORE_LABEL, IN_SLICE, OUT_OF_SLICE};
pub use membership::{CsrMatrix, SliceMembership};
pub use naming::{SliceRole, SliceTaskName, BASE_SLICE};

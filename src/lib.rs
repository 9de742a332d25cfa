pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod manifest;
pub mod slicing;

pub use crate::core::{Module, ModulePool, MultitaskModel, Operation, Task};
pub use error::{Error, Result};
pub use slicing::{add_slice_labels, convert_to_slice_tasks, LabelStore, SliceMembership};

//! Integration test suite for slicekit.
//!
//! These tests drive the public API the way a training pipeline does:
//! materialize slice labels, expand the base task, bind the task list
//! into a multitask model and run forward passes through it.
//!
//! # Test Categories
//!
//! - `slice_pipeline`: Labels, expansion and execution end to end
//! - `model_registry`: Pool merging and flow validation across tasks
//! - `properties`: Property tests for label and expansion invariants

mod fixtures;

mod slice_pipeline;
mod model_registry;
mod properties;

//! Core multi-task data model.
//!
//! Modules, the pools that name them, operations wiring them into flows,
//! and tasks tying a flow to a head and a scorer. [`model::MultitaskModel`]
//! merges task pools into one shared registry and executes flows.

pub mod dag;
pub mod model;
pub mod module;
pub mod operation;
pub mod pool;
pub mod task;

pub use dag::FlowGraph;
pub use model::MultitaskModel;
pub use module::{
    unwrap_replicated, Dims, Linear, Module, ModuleId, ModuleKind, ModuleRef, Replicated,
};
pub use operation::{InputRef, Operation};
pub use pool::{ModulePool, PoolBuilder};
pub use task::{Scorer, Task};

//! Task data model.
//!
//! A task is a named flow of operations over a module pool plus the scorer
//! configuration used to evaluate it. Tasks are identified by name.

use crate::core::module::ModuleKind;
use crate::core::operation::Operation;
use crate::core::pool::ModulePool;
use serde::{Deserialize, Serialize};

/// Scorer configuration.
///
/// Opaque to slicing: it is chosen per task and passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scorer {
    pub metrics: Vec<String>,
}

impl Scorer {
    pub fn new<S: Into<String>>(metrics: impl IntoIterator<Item = S>) -> Self {
        Self {
            metrics: metrics.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.metrics.join(", "))
    }
}

/// A prediction task.
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task name.
    pub name: String,
    /// Modules available to the flow. May be shared with other tasks.
    pub module_pool: ModulePool,
    /// Operations in execution order.
    pub task_flow: Vec<Operation>,
    /// Explicitly tagged head operation, if any.
    pub head_op: Option<String>,
    pub scorer: Scorer,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        module_pool: ModulePool,
        task_flow: Vec<Operation>,
        scorer: Scorer,
    ) -> Self {
        Self {
            name: name.into(),
            module_pool,
            task_flow,
            head_op: None,
            scorer,
        }
    }

    /// Tag the operation that produces this task's prediction.
    pub fn with_head(mut self, op_name: impl Into<String>) -> Self {
        self.head_op = Some(op_name.into());
        self
    }

    /// The head operation: the tagged one, or the last one when untagged.
    pub fn head_operation(&self) -> Option<&Operation> {
        match &self.head_op {
            Some(name) => self.task_flow.iter().find(|op| &op.name == name),
            None => self.task_flow.last(),
        }
    }

    pub fn flow_len(&self) -> usize {
        self.task_flow.len()
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.task_flow.iter().find(|op| op.name == name)
    }

    /// Check if the pool holds a slice combiner (i.e. the task was already expanded).
    pub fn has_combiner(&self) -> bool {
        self.module_pool
            .iter()
            .any(|(_, module)| module.kind() == ModuleKind::Combiner)
    }
}

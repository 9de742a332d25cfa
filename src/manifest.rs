//! JSON manifests for the command line.
//!
//! A [`TaskManifest`] describes a base task structurally (module shapes,
//! flow, scorer); [`TaskSummary`] reports an expanded task list back,
//! including module identities so weight sharing is visible in the output.

use crate::core::dag::FlowGraph;
use crate::core::module::{Dims, Linear, ModuleId, ModuleKind, ModuleRef, Replicated};
use crate::core::operation::Operation;
use crate::core::pool::ModulePool;
use crate::core::task::{Scorer, Task};
use crate::error::Result;
use crate::slicing::membership::{CsrMatrix, SliceMembership};
use crate::slicing::naming::{SliceRole, SliceTaskName};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleManifest {
    Linear {
        input: usize,
        output: usize,
        /// Wrap the layer for replicated execution.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replicas: Option<usize>,
    },
}

impl ModuleManifest {
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> ModuleRef {
        match self {
            ModuleManifest::Linear {
                input,
                output,
                replicas,
            } => {
                let linear: ModuleRef = Arc::new(Linear::with_rng(*input, *output, &mut *rng));
                match replicas {
                    Some(n) => Arc::new(Replicated::new(linear, *n)),
                    None => linear,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskManifest {
    pub name: String,
    pub modules: BTreeMap<String, ModuleManifest>,
    pub flow: Vec<Operation>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub scorer: Scorer,
}

impl TaskManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Instantiate fresh modules and assemble the task.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Task {
        let pool: ModulePool = self
            .modules
            .iter()
            .map(|(name, module)| (name.clone(), module.build(&mut *rng)))
            .collect();
        let task = Task::new(self.name.clone(), pool, self.flow.clone(), self.scorer.clone());
        match &self.head {
            Some(head) => task.with_head(head.clone()),
            None => task,
        }
    }
}

/// Sparse membership as read from JSON: `entries` are `[row, col]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipManifest {
    pub rows: usize,
    pub names: Vec<String>,
    #[serde(default)]
    pub entries: Vec<(usize, usize)>,
}

impl MembershipManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn build(&self) -> Result<SliceMembership> {
        let csr = CsrMatrix::from_coords(self.rows, self.names.len(), &self.entries)?;
        Ok(SliceMembership::from_sparse(&csr, self.names.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRole {
    Indicator,
    Predictor,
    Master,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    pub id: ModuleId,
    pub kind: ModuleKind,
    pub dims: Option<Dims>,
    /// Whether the task's own flow executes this module.
    pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub name: String,
    pub role: TaskRole,
    pub head: Option<String>,
    pub scorer: Scorer,
    pub flow: Vec<String>,
    pub modules: Vec<ModuleSummary>,
}

impl TaskSummary {
    pub fn from_task(task: &Task) -> Result<Self> {
        let role = match SliceTaskName::parse(&task.name) {
            Some(name) if name.role == SliceRole::Indicator => TaskRole::Indicator,
            Some(_) => TaskRole::Predictor,
            None if task.has_combiner() => TaskRole::Master,
            None => TaskRole::Plain,
        };
        // Pools may hold modules from sibling tasks; only reachability matters here.
        let used = FlowGraph::build(&task.task_flow, |_| true)?.reachable_modules();

        Ok(Self {
            name: task.name.clone(),
            role,
            head: task.head_operation().map(|op| op.name.clone()),
            scorer: task.scorer.clone(),
            flow: task.task_flow.iter().map(|op| op.name.clone()).collect(),
            modules: task
                .module_pool
                .iter()
                .map(|(name, module)| ModuleSummary {
                    name: name.to_string(),
                    id: module.id(),
                    kind: module.kind(),
                    dims: module.dims(),
                    used: used.contains(name),
                })
                .collect(),
        })
    }
}

//! Multitask model: a task list bound to one merged module registry.
//!
//! Task pools are merged by module name the way a multitask classifier
//! collects the modules of all its tasks. A flow may therefore reference
//! modules that live in a sibling task's pool (the master task relies on
//! this for its backbone).

use crate::core::dag::FlowGraph;
use crate::core::module::ModuleRef;
use crate::core::operation::InputRef;
use crate::core::task::Task;
use crate::error::{Error, Result};
use crate::sklog_debug;
use ndarray::Array1;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub struct MultitaskModel {
    tasks: Vec<Task>,
    task_index: HashMap<String, usize>,
    modules: BTreeMap<String, ModuleRef>,
}

impl MultitaskModel {
    /// Merge the pools of `tasks` and validate every flow against the result.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Two tasks share a name
    /// - One module name is bound to two different modules
    /// - A flow references an unknown module or a later operation
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        let mut task_index = HashMap::new();
        let mut modules: BTreeMap<String, ModuleRef> = BTreeMap::new();

        for (position, task) in tasks.iter().enumerate() {
            if task_index.insert(task.name.clone(), position).is_some() {
                return Err(Error::Validation(format!(
                    "Task {} appears twice in the model",
                    task.name
                )));
            }
            for (name, module) in task.module_pool.iter() {
                match modules.get(name) {
                    Some(existing) if !Arc::ptr_eq(existing, module) => {
                        return Err(Error::ModuleConflict(name.to_string()));
                    }
                    Some(_) => {}
                    None => {
                        modules.insert(name.to_string(), module.clone());
                    }
                }
            }
        }

        for task in &tasks {
            FlowGraph::build(&task.task_flow, |name| modules.contains_key(name))?;
        }

        sklog_debug!(
            "MultitaskModel: {} tasks, {} modules",
            tasks.len(),
            modules.len()
        );

        Ok(Self {
            tasks,
            task_index,
            modules,
        })
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.task_index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn module(&self, name: &str) -> Option<&ModuleRef> {
        self.modules.get(name)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Run `task_name`'s flow on one example and return its head output.
    pub fn forward(
        &self,
        task_name: &str,
        inputs: &HashMap<String, Array1<f32>>,
    ) -> Result<Array1<f32>> {
        let task = self
            .task(task_name)
            .ok_or_else(|| Error::TaskNotFound(task_name.to_string()))?;
        let head = task
            .head_operation()
            .ok_or_else(|| Error::EmptyFlow(task.name.clone()))?;

        let mut outputs: HashMap<&str, Vec<Array1<f32>>> = HashMap::new();
        for op in &task.task_flow {
            let module = self
                .modules
                .get(&op.module_name)
                .ok_or_else(|| Error::ModuleNotFound(op.module_name.clone()))?;

            let produced = {
                let args = op
                    .inputs
                    .iter()
                    .map(|input| resolve(input, inputs, &outputs))
                    .collect::<Result<Vec<_>>>()?;
                module.forward(&args)?
            };
            outputs.insert(op.name.as_str(), produced);
        }

        outputs
            .remove(head.name.as_str())
            .and_then(|mut produced| {
                if produced.is_empty() {
                    None
                } else {
                    Some(produced.swap_remove(0))
                }
            })
            .ok_or_else(|| Error::Validation(format!("Head {} produced no output", head.name)))
    }
}

fn resolve<'a>(
    input: &InputRef,
    external: &'a HashMap<String, Array1<f32>>,
    outputs: &'a HashMap<&str, Vec<Array1<f32>>>,
) -> Result<&'a Array1<f32>> {
    match input {
        InputRef::External(key) => external
            .get(key)
            .ok_or_else(|| Error::Validation(format!("Missing external input {}", key))),
        InputRef::Output { op, index } => outputs
            .get(op.as_str())
            .and_then(|produced| produced.get(*index))
            .ok_or_else(|| Error::Validation(format!("Operation {} has no output {}", op, index))),
    }
}

impl std::fmt::Debug for MultitaskModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultitaskModel")
            .field("tasks", &self.tasks.len())
            .field("modules", &self.modules.len())
            .finish()
    }
}

//! Slice task expansion.
//!
//! A base task is first captured as an immutable [`BaseTask`]: its flow
//! minus the head operation (the shared body), its pool minus the head
//! module, and the head's dimensions. [`SliceExpander`] then emits, for
//! every slice, an indicator task and a predictor task over the body, and
//! one master task that replaces the base task. The caller's task is never
//! modified.
//!
//! Indicator and predictor tasks all hold the same frozen pool, so each of
//! them can see every slice module even though its flow uses only its own.

use crate::config::Config;
use crate::core::dag::FlowGraph;
use crate::core::module::{unwrap_replicated, Linear, ModuleRef};
use crate::core::operation::{InputRef, Operation};
use crate::core::pool::ModulePool;
use crate::core::task::{Scorer, Task};
use crate::error::{Error, Result};
use crate::slicing::combiner::{SliceCombiner, SliceInputs};
use crate::slicing::naming::{
    ensure_unique, master_combiner_name, master_head_name, with_base_slice, SliceTaskName,
};
use crate::{sklog, sklog_debug, sklog_trace, sklog_warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Immutable decomposition of a base task into body and head.
#[derive(Debug, Clone)]
pub struct BaseTask {
    name: String,
    body_flow: Vec<Operation>,
    body_pool: ModulePool,
    head_module: ModuleRef,
    head_inputs: Vec<InputRef>,
    neck_size: usize,
    cardinality: usize,
    scorer: Scorer,
}

impl BaseTask {
    /// Capture `task` without modifying it.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The task already carries a slice combiner
    /// - The flow is empty or does not form a valid DAG over the pool
    /// - A tagged head operation is not the last operation
    /// - The head module is missing, has no usable dimensions, or is also
    ///   run by a body operation
    pub fn snapshot(task: &Task) -> Result<Self> {
        if task.has_combiner() {
            return Err(Error::AlreadyExpanded(task.name.clone()));
        }

        let (head_op, body_flow) = task
            .task_flow
            .split_last()
            .ok_or_else(|| Error::EmptyFlow(task.name.clone()))?;

        match &task.head_op {
            Some(tag) if tag != &head_op.name => {
                return Err(Error::HeadNotLast {
                    task: task.name.clone(),
                    head: tag.clone(),
                });
            }
            Some(_) => {}
            None => {
                sklog_warn!(
                    "BaseTask::snapshot: {} has no head tag, using last operation {}",
                    task.name,
                    head_op.name
                );
            }
        }

        FlowGraph::build(&task.task_flow, |name| task.module_pool.contains(name))?;

        let head_module = task
            .module_pool
            .get(&head_op.module_name)
            .ok_or_else(|| Error::ModuleNotFound(head_op.module_name.clone()))?
            .clone();
        let dims = unwrap_replicated(&head_module)
            .dims()
            .filter(|d| d.input > 0 && d.output > 0)
            .ok_or_else(|| Error::MissingDims(head_op.module_name.clone()))?;

        // The head module leaves the body pool, so the body must not run it.
        if let Some(op) = body_flow
            .iter()
            .find(|op| op.module_name == head_op.module_name)
        {
            return Err(Error::SharedHeadModule {
                task: task.name.clone(),
                module: op.module_name.clone(),
            });
        }

        let mut body_pool = task.module_pool.to_builder();
        body_pool.remove(&head_op.module_name);

        Ok(Self {
            name: task.name.clone(),
            body_flow: body_flow.to_vec(),
            body_pool: body_pool.freeze(),
            head_module,
            head_inputs: head_op.inputs.clone(),
            neck_size: dims.input,
            cardinality: dims.output,
            scorer: task.scorer.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body_flow(&self) -> &[Operation] {
        &self.body_flow
    }

    pub fn body_pool(&self) -> &ModulePool {
        &self.body_pool
    }

    /// The original head module, wrapped or not, as stored in the pool.
    pub fn head_module(&self) -> &ModuleRef {
        &self.head_module
    }

    pub fn head_inputs(&self) -> &[InputRef] {
        &self.head_inputs
    }

    /// Input width of the head: the representation every slice head reads.
    pub fn neck_size(&self) -> usize {
        self.neck_size
    }

    /// Output width of the head: the number of classes.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }
}

/// Builds slice-aware task lists from base task snapshots.
#[derive(Debug, Clone)]
pub struct SliceExpander {
    indicator_scorer: Scorer,
    temperature: f32,
    seed: Option<u64>,
}

impl Default for SliceExpander {
    fn default() -> Self {
        let config = Config::default();
        Self {
            indicator_scorer: Scorer::new(config.indicator_metrics),
            temperature: config.combiner_temperature,
            seed: config.seed,
        }
    }
}

impl SliceExpander {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            indicator_scorer: Scorer::new(config.indicator_metrics.iter().cloned()),
            temperature: config.combiner_temperature,
            seed: config.seed,
        })
    }

    /// Expand `base` into indicator tasks, predictor tasks and a master task.
    ///
    /// The base slice is appended to `slice_names` if absent. The returned
    /// list holds all indicator tasks, then all predictor tasks (both in
    /// slice order), then the master task, which takes the base task's name.
    pub fn expand<S: AsRef<str>>(&self, base: &BaseTask, slice_names: &[S]) -> Result<Vec<Task>> {
        let slices = with_base_slice(slice_names);
        ensure_unique(&slices)?;

        let neck = base.neck_size;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut pool = base.body_pool.to_builder();

        // Indicator heads are always binary: in the slice or not.
        let mut indicator_ops = Vec::with_capacity(slices.len());
        for slice in &slices {
            let task_name = SliceTaskName::indicator(&base.name, slice);
            let module_name = task_name.head_module_name();
            pool.insert(
                module_name.clone(),
                Arc::new(Linear::with_rng(neck, 2, &mut rng)),
            );
            indicator_ops.push(Operation::new(module_name, base.head_inputs.clone()));
            sklog_debug!("SliceExpander: indicator {} head {}->2", task_name, neck);
        }

        // One predictor head shared by every slice, each behind its own transform.
        let shared_head: ModuleRef =
            Arc::new(Linear::with_rng(neck, base.cardinality, &mut rng));
        let mut predictor_ops = Vec::with_capacity(slices.len());
        let mut combiner_inputs = Vec::with_capacity(slices.len());
        for (slice, indicator_op) in slices.iter().zip(&indicator_ops) {
            let task_name = SliceTaskName::predictor(&base.name, slice);
            let transform_name = task_name.transform_module_name();
            let head_name = task_name.head_module_name();
            pool.insert(
                transform_name.clone(),
                Arc::new(Linear::with_rng(neck, neck, &mut rng)),
            );
            pool.insert(head_name.clone(), shared_head.clone());

            let transform_op = Operation::new(transform_name, base.head_inputs.clone());
            let head_op = Operation::new(head_name, vec![transform_op.output(0)]);
            combiner_inputs.push(SliceInputs {
                representation: transform_op.output(0),
                predictor_logits: head_op.output(0),
                indicator_logits: indicator_op.output(0),
            });
            predictor_ops.push([transform_op, head_op]);
            sklog_debug!(
                "SliceExpander: predictor {} transform {}->{} head {}->{}",
                task_name,
                neck,
                neck,
                neck,
                base.cardinality
            );
        }

        let pool = pool.freeze();
        let mut tasks = Vec::with_capacity(2 * slices.len() + 1);

        for (slice, op) in slices.iter().zip(&indicator_ops) {
            let mut flow = base.body_flow.clone();
            flow.push(op.clone());
            tasks.push(
                Task::new(
                    SliceTaskName::indicator(&base.name, slice).to_string(),
                    pool.clone(),
                    flow,
                    self.indicator_scorer.clone(),
                )
                .with_head(op.name.clone()),
            );
        }

        for (slice, ops) in slices.iter().zip(&predictor_ops) {
            let mut flow = base.body_flow.clone();
            flow.extend(ops.iter().cloned());
            tasks.push(
                Task::new(
                    SliceTaskName::predictor(&base.name, slice).to_string(),
                    pool.clone(),
                    flow,
                    base.scorer.clone(),
                )
                .with_head(ops[1].name.clone()),
            );
        }

        tasks.push(self.master_task(base, indicator_ops, predictor_ops, &combiner_inputs)?);

        sklog!(
            "Expanded {} into {} tasks over {} slices (neck={}, cardinality={})",
            base.name,
            tasks.len(),
            slices.len(),
            neck,
            base.cardinality
        );
        sklog_trace!("SliceExpander: shared pool {:?}", pool);

        Ok(tasks)
    }

    fn master_task(
        &self,
        base: &BaseTask,
        indicator_ops: Vec<Operation>,
        predictor_ops: Vec<[Operation; 2]>,
        combiner_inputs: &[SliceInputs],
    ) -> Result<Task> {
        let combiner_name = master_combiner_name(&base.name);
        let head_name = master_head_name(&base.name);
        let combiner: ModuleRef = Arc::new(SliceCombiner::new(base.neck_size, self.temperature)?);

        let master_pool: ModulePool = vec![
            (combiner_name.clone(), combiner),
            (head_name.clone(), base.head_module.clone()),
        ]
        .into_iter()
        .collect();

        let combiner_op = Operation::new(combiner_name, SliceInputs::flatten(combiner_inputs));
        let head_op = Operation::new(head_name, vec![combiner_op.output(0)]);
        let head_op_name = head_op.name.clone();

        let mut flow = base.body_flow.clone();
        flow.extend(indicator_ops);
        flow.extend(predictor_ops.into_iter().flatten());
        flow.push(combiner_op);
        flow.push(head_op);

        Ok(
            Task::new(base.name.clone(), master_pool, flow, base.scorer.clone())
                .with_head(head_op_name),
        )
    }
}

/// Snapshot `base_task` and expand it with the settings in `config`.
pub fn convert_to_slice_tasks<S: AsRef<str>>(
    base_task: &Task,
    slice_names: &[S],
    config: &Config,
) -> Result<Vec<Task>> {
    let base = BaseTask::snapshot(base_task)?;
    SliceExpander::new(config)?.expand(&base, slice_names)
}

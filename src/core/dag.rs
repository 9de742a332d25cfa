//! Flow DAG for a task's operations.
//!
//! A task flow is an ordered list of operations whose order doubles as a
//! topological order. FlowGraph checks that claim (every reference points
//! at an earlier operation, every module resolves) and answers structural
//! questions about the induced graph.

use crate::core::operation::{InputRef, Operation};
use crate::error::{Error, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use std::collections::{BTreeSet, HashMap};

/// The operation dependency graph of one flow.
///
/// Nodes are operation names; an edge `a -> b` weighted `i` means `b`
/// consumes output `i` of `a`.
pub struct FlowGraph {
    graph: DiGraph<String, usize>,
    op_index: HashMap<String, NodeIndex>,
    modules: HashMap<String, String>,
    external_inputs: BTreeSet<String>,
}

impl FlowGraph {
    /// Build the graph for `flow`, resolving module names with `has_module`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Two operations share a name
    /// - An operation's module does not resolve
    /// - An operation reads from itself or from a later/unknown operation
    pub fn build(flow: &[Operation], has_module: impl Fn(&str) -> bool) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut op_index = HashMap::new();
        let mut modules = HashMap::new();
        let mut external_inputs = BTreeSet::new();

        for op in flow {
            if op_index.contains_key(&op.name) {
                return Err(Error::Validation(format!(
                    "Operation {} appears twice in the flow",
                    op.name
                )));
            }
            if !has_module(&op.module_name) {
                return Err(Error::ModuleNotFound(op.module_name.clone()));
            }

            let index = graph.add_node(op.name.clone());
            for input in &op.inputs {
                match input {
                    InputRef::External(key) => {
                        external_inputs.insert(key.clone());
                    }
                    InputRef::Output { op: source, index: output } => {
                        let source_index =
                            op_index
                                .get(source)
                                .ok_or_else(|| Error::ForwardReference {
                                    op: op.name.clone(),
                                    target: source.clone(),
                                })?;
                        graph.add_edge(*source_index, index, *output);
                    }
                }
            }
            op_index.insert(op.name.clone(), index);
            modules.insert(op.name.clone(), op.module_name.clone());
        }

        Ok(Self {
            graph,
            op_index,
            modules,
            external_inputs,
        })
    }

    pub fn operation_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_operation(&self, name: &str) -> bool {
        self.op_index.contains_key(name)
    }

    /// External input keys the flow reads.
    pub fn external_inputs(&self) -> &BTreeSet<String> {
        &self.external_inputs
    }

    /// Module names executed by this flow.
    ///
    /// A task's pool may hold more modules than this; only these run.
    pub fn reachable_modules(&self) -> BTreeSet<String> {
        self.modules.values().cloned().collect()
    }

    /// Operations in dependency order.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let name = self
                .graph
                .node_weight(cycle.node_id())
                .map(String::as_str)
                .unwrap_or("unknown");
            Error::Validation(format!("Cycle detected at operation: {}", name))
        })?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index).map(String::as_str))
            .collect())
    }

    /// All operations `name` transitively depends on, excluding itself.
    pub fn upstream_of(&self, name: &str) -> Result<BTreeSet<String>> {
        let start = *self
            .op_index
            .get(name)
            .ok_or_else(|| Error::Validation(format!("Operation {} not in flow", name)))?;

        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut upstream = BTreeSet::new();
        while let Some(index) = dfs.next(reversed) {
            if index != start {
                if let Some(op) = self.graph.node_weight(index) {
                    upstream.insert(op.clone());
                }
            }
        }
        Ok(upstream)
    }

    /// Operations that consume an output of `name`.
    pub fn consumers_of(&self, name: &str) -> Vec<&str> {
        match self.op_index.get(name) {
            Some(&index) => self
                .graph
                .neighbors_directed(index, petgraph::Direction::Outgoing)
                .filter_map(|n| self.graph.node_weight(n).map(String::as_str))
                .collect(),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for FlowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowGraph")
            .field("operations", &self.operation_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

//! Operations: named nodes of a task flow.

use serde::{Deserialize, Serialize};

/// Where an operation reads one of its inputs from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRef {
    /// A named input supplied by the data layer.
    External(String),
    /// Output `index` of an earlier operation.
    Output { op: String, index: usize },
}

impl InputRef {
    pub fn external(key: impl Into<String>) -> Self {
        Self::External(key.into())
    }

    pub fn output(op: impl Into<String>, index: usize) -> Self {
        Self::Output {
            op: op.into(),
            index,
        }
    }
}

impl std::fmt::Display for InputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputRef::External(key) => write!(f, "{}", key),
            InputRef::Output { op, index } => write!(f, "{}[{}]", op, index),
        }
    }
}

/// A module applied to an ordered list of inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub module_name: String,
    #[serde(default)]
    pub inputs: Vec<InputRef>,
}

impl Operation {
    /// Create an operation named after its module.
    pub fn new(module_name: impl Into<String>, inputs: Vec<InputRef>) -> Self {
        let module_name = module_name.into();
        Self {
            name: module_name.clone(),
            module_name,
            inputs,
        }
    }

    pub fn named(
        name: impl Into<String>,
        module_name: impl Into<String>,
        inputs: Vec<InputRef>,
    ) -> Self {
        Self {
            name: name.into(),
            module_name: module_name.into(),
            inputs,
        }
    }

    /// Reference to output `index` of this operation.
    pub fn output(&self, index: usize) -> InputRef {
        InputRef::output(self.name.clone(), index)
    }
}

//! Module data model.
//!
//! Modules are opaque parameterized functions with a fixed input and
//! output dimensionality. The graph surgery in [`crate::slicing`] only
//! needs to read those dimensions and see through replication wrappers;
//! `forward` exists so an expanded graph can be exercised end to end.

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to a module. Cloning the handle shares the weights.
pub type ModuleRef = Arc<dyn Module>;

/// Identity of a module instance.
///
/// Two pool entries with the same `ModuleId` are the same weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub Uuid);

impl ModuleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ModuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Linear,
    Replicated,
    Combiner,
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKind::Linear => write!(f, "linear"),
            ModuleKind::Replicated => write!(f, "replicated"),
            ModuleKind::Combiner => write!(f, "combiner"),
        }
    }
}

/// Input and output dimensionality of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dims {
    pub input: usize,
    pub output: usize,
}

impl Dims {
    pub fn new(input: usize, output: usize) -> Self {
        Self { input, output }
    }
}

impl std::fmt::Display for Dims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.input, self.output)
    }
}

/// A parameterized computation unit.
pub trait Module: std::fmt::Debug + Send + Sync {
    fn id(&self) -> ModuleId;

    fn kind(&self) -> ModuleKind;

    /// Fixed dimensionality, if the module has one.
    fn dims(&self) -> Option<Dims>;

    /// Run the module on a single example.
    fn forward(&self, inputs: &[&Array1<f32>]) -> Result<Vec<Array1<f32>>>;

    /// The wrapped module, for replication wrappers.
    fn inner(&self) -> Option<&ModuleRef> {
        None
    }
}

/// Follow replication wrappers down to the module that owns the weights.
///
/// Read-only: the returned handle is the wrapped module itself, never a copy.
pub fn unwrap_replicated(module: &ModuleRef) -> &ModuleRef {
    let mut current = module;
    while let Some(inner) = current.inner() {
        current = inner;
    }
    current
}

/// Fully connected layer `y = W x + b`.
pub struct Linear {
    id: ModuleId,
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    /// Create a layer with weights drawn from the thread-local RNG.
    pub fn new(input: usize, output: usize) -> Self {
        Self::with_rng(input, output, &mut rand::thread_rng())
    }

    /// Create a layer with weights drawn uniformly from `±1/sqrt(input)`.
    pub fn with_rng<R: Rng + ?Sized>(input: usize, output: usize, rng: &mut R) -> Self {
        let bound = if input == 0 {
            0.0
        } else {
            1.0 / (input as f32).sqrt()
        };
        let mut sample = || {
            if bound > 0.0 {
                rng.gen_range(-bound..bound)
            } else {
                0.0
            }
        };
        let weight = Array2::from_shape_fn((output, input), |_| sample());
        let bias = Array1::from_shape_fn(output, |_| sample());
        Self {
            id: ModuleId::new(),
            weight,
            bias,
        }
    }

    /// Create a layer from explicit parameters. `weight` is `output × input`.
    pub fn from_weights(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        if weight.nrows() != bias.len() {
            return Err(Error::ShapeMismatch {
                context: "linear bias".to_string(),
                expected: weight.nrows(),
                found: bias.len(),
            });
        }
        Ok(Self {
            id: ModuleId::new(),
            weight,
            bias,
        })
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }
}

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("id", &self.id.short())
            .field("in_features", &self.weight.ncols())
            .field("out_features", &self.weight.nrows())
            .finish()
    }
}

impl Module for Linear {
    fn id(&self) -> ModuleId {
        self.id
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Linear
    }

    fn dims(&self) -> Option<Dims> {
        Some(Dims::new(self.weight.ncols(), self.weight.nrows()))
    }

    fn forward(&self, inputs: &[&Array1<f32>]) -> Result<Vec<Array1<f32>>> {
        let [x] = inputs else {
            return Err(Error::Arity {
                module: format!("linear {}", self.id.short()),
                expected: "1".to_string(),
                found: inputs.len(),
            });
        };
        if x.len() != self.weight.ncols() {
            return Err(Error::ShapeMismatch {
                context: format!("linear {} input", self.id.short()),
                expected: self.weight.ncols(),
                found: x.len(),
            });
        }
        Ok(vec![self.weight.dot(*x) + &self.bias])
    }
}

/// Transparent wrapper for a module replicated across execution units.
///
/// Everything delegates to the inner module; the wrapper adds no weights.
#[derive(Debug)]
pub struct Replicated {
    id: ModuleId,
    inner: ModuleRef,
    replicas: usize,
}

impl Replicated {
    pub fn new(inner: ModuleRef, replicas: usize) -> Self {
        Self {
            id: ModuleId::new(),
            inner,
            replicas,
        }
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }
}

impl Module for Replicated {
    fn id(&self) -> ModuleId {
        self.id
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Replicated
    }

    fn dims(&self) -> Option<Dims> {
        self.inner.dims()
    }

    fn forward(&self, inputs: &[&Array1<f32>]) -> Result<Vec<Array1<f32>>> {
        self.inner.forward(inputs)
    }

    fn inner(&self) -> Option<&ModuleRef> {
        Some(&self.inner)
    }
}

//! Master combiner for slice-aware tasks.
//!
//! The combiner reads, for every slice in order, three inputs:
//! the predictor transform's representation (`neck` wide), the predictor
//! head's logits and the indicator head's logits. Each slice is scored by
//! `P(in slice) * predictor confidence / temperature`; the softmax of the
//! scores weights the representations into one `neck`-wide vector that the
//! reused base head turns into the final prediction.

use crate::core::module::{Dims, Module, ModuleId, ModuleKind};
use crate::core::operation::InputRef;
use crate::error::{Error, Result};
use ndarray::Array1;

/// Number of inputs the combiner reads per slice.
pub const INPUTS_PER_SLICE: usize = 3;

/// Operation outputs one slice contributes to the combiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceInputs {
    pub representation: InputRef,
    pub predictor_logits: InputRef,
    pub indicator_logits: InputRef,
}

impl SliceInputs {
    /// Flatten into the combiner's declared input order.
    pub fn flatten(slices: &[SliceInputs]) -> Vec<InputRef> {
        slices
            .iter()
            .flat_map(|s| {
                [
                    s.representation.clone(),
                    s.predictor_logits.clone(),
                    s.indicator_logits.clone(),
                ]
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct SliceCombiner {
    id: ModuleId,
    neck_size: usize,
    temperature: f32,
}

impl SliceCombiner {
    pub fn new(neck_size: usize, temperature: f32) -> Result<Self> {
        if temperature.is_nan() || temperature <= 0.0 {
            return Err(Error::Validation(format!(
                "Combiner temperature must be positive, got {}",
                temperature
            )));
        }
        Ok(Self {
            id: ModuleId::new(),
            neck_size,
            temperature,
        })
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Per-slice attention weights for one example.
    pub fn weights(&self, inputs: &[&Array1<f32>]) -> Result<Array1<f32>> {
        self.check_arity(inputs)?;
        let scores: Array1<f32> = inputs
            .chunks(INPUTS_PER_SLICE)
            .map(|chunk| {
                let in_slice = softmax(chunk[2]).get(0).copied().unwrap_or(0.0);
                let confidence = softmax(chunk[1]).iter().copied().fold(0.0, f32::max);
                in_slice * confidence / self.temperature
            })
            .collect();
        Ok(softmax(&scores))
    }

    fn check_arity(&self, inputs: &[&Array1<f32>]) -> Result<()> {
        if inputs.is_empty() || inputs.len() % INPUTS_PER_SLICE != 0 {
            return Err(Error::Arity {
                module: "slice combiner".to_string(),
                expected: format!("a positive multiple of {}", INPUTS_PER_SLICE),
                found: inputs.len(),
            });
        }
        for chunk in inputs.chunks(INPUTS_PER_SLICE) {
            if chunk[0].len() != self.neck_size {
                return Err(Error::ShapeMismatch {
                    context: "slice combiner representation".to_string(),
                    expected: self.neck_size,
                    found: chunk[0].len(),
                });
            }
            if chunk[2].len() != 2 {
                return Err(Error::ShapeMismatch {
                    context: "slice combiner indicator logits".to_string(),
                    expected: 2,
                    found: chunk[2].len(),
                });
            }
        }
        Ok(())
    }
}

impl Module for SliceCombiner {
    fn id(&self) -> ModuleId {
        self.id
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Combiner
    }

    fn dims(&self) -> Option<Dims> {
        Some(Dims::new(self.neck_size, self.neck_size))
    }

    fn forward(&self, inputs: &[&Array1<f32>]) -> Result<Vec<Array1<f32>>> {
        let weights = self.weights(inputs)?;
        let combined = inputs
            .chunks(INPUTS_PER_SLICE)
            .zip(weights.iter())
            .fold(Array1::zeros(self.neck_size), |acc, (chunk, &w)| {
                acc + &(chunk[0] * w)
            });
        Ok(vec![combined])
    }
}

/// Numerically stable softmax.
fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    exp / sum
}

//! Slice task naming.
//!
//! Derived tasks are named `{base}_slice:{slice}_{ind|pred}`; their modules
//! and operations append `_head` / `_transform` to the task name.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Name of the implicit slice that covers every example.
pub const BASE_SLICE: &str = "base";

static SLICE_TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<base>.+)_slice:(?P<slice>.+)_(?P<role>ind|pred)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceRole {
    /// Predicts whether an example belongs to the slice.
    Indicator,
    /// Predicts the base label for slice members.
    Predictor,
}

impl SliceRole {
    pub fn suffix(&self) -> &'static str {
        match self {
            SliceRole::Indicator => "ind",
            SliceRole::Predictor => "pred",
        }
    }
}

impl std::fmt::Display for SliceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceRole::Indicator => write!(f, "indicator"),
            SliceRole::Predictor => write!(f, "predictor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SliceTaskName {
    pub base: String,
    pub slice: String,
    pub role: SliceRole,
}

impl SliceTaskName {
    pub fn new(base: &str, slice: &str, role: SliceRole) -> Self {
        Self {
            base: base.to_string(),
            slice: slice.to_string(),
            role,
        }
    }

    pub fn indicator(base: &str, slice: &str) -> Self {
        Self::new(base, slice, SliceRole::Indicator)
    }

    pub fn predictor(base: &str, slice: &str) -> Self {
        Self::new(base, slice, SliceRole::Predictor)
    }

    /// Parse a derived task name. Returns `None` for non-slice names.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = SLICE_TASK_RE.captures(name)?;
        let role = match &caps["role"] {
            "ind" => SliceRole::Indicator,
            _ => SliceRole::Predictor,
        };
        Some(Self::new(&caps["base"], &caps["slice"], role))
    }

    pub fn head_module_name(&self) -> String {
        format!("{}_head", self)
    }

    pub fn transform_module_name(&self) -> String {
        format!("{}_transform", self)
    }
}

impl std::fmt::Display for SliceTaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_slice:{}_{}", self.base, self.slice, self.role.suffix())
    }
}

pub fn master_combiner_name(base: &str) -> String {
    format!("{}_master_combiner", base)
}

pub fn master_head_name(base: &str) -> String {
    format!("{}_master_head", base)
}

/// Append the base slice unless it is already present.
pub fn with_base_slice<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    if !names.iter().any(|n| n == BASE_SLICE) {
        names.push(BASE_SLICE.to_string());
    }
    names
}

/// Reject repeated slice names.
pub fn ensure_unique<S: AsRef<str>>(names: &[S]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_ref()) {
            return Err(Error::DuplicateSlice(name.as_ref().to_string()));
        }
    }
    Ok(())
}

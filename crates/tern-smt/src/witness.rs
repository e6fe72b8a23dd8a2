use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Value of one variable in one step of a witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    /// Numeric view used by waveform dumps.
    pub fn as_i64(&self) -> i64 {
        match self {
            Value::Bool(b) => i64::from(*b),
            Value::Int(n) => *n,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
        }
    }
}

/// A finite execution, optionally closing into a loop.
///
/// `steps[i]` maps variable names to their value at step `i`. When
/// `loop_back` is `Some(l)`, the last step is followed by step `l` again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub steps: Vec<IndexMap<String, Value>>,
    pub loop_back: Option<usize>,
}

impl Witness {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Value of `var` at `step`.
    pub fn value(&self, step: usize, var: &str) -> Option<Value> {
        self.steps.get(step)?.get(var).copied()
    }

    /// Variable names in first-seen order.
    pub fn variables(&self) -> Vec<&str> {
        let mut seen: IndexMap<&str, ()> = IndexMap::new();
        for step in &self.steps {
            for name in step.keys() {
                seen.insert(name.as_str(), ());
            }
        }
        seen.into_keys().collect()
    }
}

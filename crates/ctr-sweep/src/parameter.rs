use std::collections::BTreeMap;

use ctr_core::errors::{CtrError, ErrorInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Variable mapping passed to a playbook run.
pub type Vars = BTreeMap<String, Value>;

fn validation(code: &str, message: impl Into<String>) -> ErrorInfo {
    ErrorInfo::new(code, message)
}

/// Reference to a playbook plus the constants scoped to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookRef {
    /// Playbook path handed to the runner.
    pub path: String,
    /// Variables owned by this playbook.
    #[serde(default)]
    pub static_vars: Vars,
    /// Tags passed through to the runner.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PlaybookRef {
    /// A playbook with no vars or tags.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            static_vars: Vars::new(),
            tags: Vec::new(),
        }
    }

    /// Replaces the static variables.
    pub fn with_vars(mut self, vars: Vars) -> Self {
        self.static_vars = vars;
        self
    }

    /// Replaces the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A named axis of variation.
///
/// `pegged` maps extra variable names to vectors aligned index for index
/// with `values`; binding value `values[i]` also binds `pegged[k][i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    values: Vec<Value>,
    cost: f64,
    pegged: BTreeMap<String, Vec<Value>>,
    transitions: Vec<PlaybookRef>,
}

impl Parameter {
    /// Validates and builds a parameter.
    pub fn new(
        name: impl Into<String>,
        values: Vec<Value>,
        cost: f64,
        pegged: BTreeMap<String, Vec<Value>>,
        transitions: Vec<PlaybookRef>,
    ) -> Result<Self, CtrError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CtrError::Validation(validation(
                "parameter.name",
                "parameter name must not be empty",
            )));
        }
        if cost.is_nan() {
            return Err(CtrError::Validation(
                validation("parameter.cost_nan", "parameter cost must be a number")
                    .with_context("parameter", &name),
            ));
        }
        for (idx, value) in values.iter().enumerate() {
            if values[..idx].contains(value) {
                return Err(CtrError::Validation(
                    validation("parameter.duplicate_value", "parameter values must be unique")
                        .with_context("parameter", &name)
                        .with_context("value", value.to_string()),
                ));
            }
        }
        for (var, vector) in &pegged {
            if vector.len() != values.len() {
                return Err(CtrError::Validation(
                    validation(
                        "parameter.pegged_length",
                        "pegged variable length does not match parameter values",
                    )
                    .with_context("parameter", &name)
                    .with_context("variable", var)
                    .with_context("expected", values.len().to_string())
                    .with_context("found", vector.len().to_string())
                    .with_hint("give one pegged entry per parameter value"),
                ));
            }
        }
        Ok(Self {
            name,
            values,
            cost,
            pegged,
            transitions,
        })
    }

    /// Convenience constructor for a plain parameter with cost 1.
    pub fn simple(name: impl Into<String>, values: Vec<Value>) -> Result<Self, CtrError> {
        Self::new(name, values, 1.0, BTreeMap::new(), Vec::new())
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Relative expense of changing this parameter.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Pegged variables by name, each aligned with `values`.
    pub fn pegged(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.pegged
    }

    /// Playbooks fired when this parameter leaves a value.
    pub fn transitions(&self) -> &[PlaybookRef] {
        &self.transitions
    }

    /// Declaration index of `value`.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|candidate| candidate == value)
    }

    /// Pegged variables bound alongside `value`; empty for unknown values.
    pub fn pegged_for(&self, value: &Value) -> Vars {
        let Some(idx) = self.index_of(value) else {
            return Vars::new();
        };
        self.pegged
            .iter()
            .map(|(var, vector)| (var.clone(), vector[idx].clone()))
            .collect()
    }
}

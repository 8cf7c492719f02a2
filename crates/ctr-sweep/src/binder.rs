use std::collections::{BTreeMap, BTreeSet};

use ctr_core::errors::{CtrError, ErrorInfo};
use serde::Serialize;
use serde_json::Value;

use crate::parameter::{Parameter, PlaybookRef, Vars};
use crate::sweep::Sweep;

/// Parameters ordered by descending cost; equal costs keep declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    /// Validates unique names and orders parameters by descending cost.
    pub fn new(mut parameters: Vec<Parameter>) -> Result<Self, CtrError> {
        let mut seen = BTreeSet::new();
        for param in &parameters {
            if !seen.insert(param.name()) {
                return Err(CtrError::Validation(
                    ErrorInfo::new("binder.duplicate_parameter", "parameter names must be unique")
                        .with_context("parameter", param.name()),
                ));
            }
        }
        // slice::sort_by is stable
        parameters.sort_by(|a, b| b.cost().total_cmp(&a.cost()));
        Ok(Self { parameters })
    }

    /// Parameters in cost order.
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|param| param.name() == name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// True when the set has no parameters.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of combinations in the full product, before exclusions.
    /// `None` when the product does not fit in a `usize`.
    pub fn cardinality(&self) -> Option<usize> {
        self.parameters
            .iter()
            .try_fold(1usize, |acc, param| acc.checked_mul(param.values().len()))
    }

    /// Lazy product over the set, skipping `excluded` assignments.
    pub fn combinations<'a>(&'a self, excluded: &'a [Exclusion]) -> Combinations<'a> {
        Combinations::new(self, excluded)
    }
}

/// A single `(parameter, value)` pair. `value` is `None` only in the
/// terminal pseudo-assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    /// Parameter name.
    pub name: String,
    /// Bound value.
    pub value: Option<Value>,
}

/// One binding per parameter, in the parameter set's cost order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    bindings: Vec<Binding>,
}

impl Assignment {
    /// Wraps bindings already in cost order.
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// Every parameter mapped to "no value".
    pub fn terminal(parameters: &ParameterSet) -> Self {
        Self {
            bindings: parameters
                .iter()
                .map(|param| Binding {
                    name: param.name().to_string(),
                    value: None,
                })
                .collect(),
        }
    }

    /// Bindings in cost order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|binding| binding.name == name)
            .and_then(|binding| binding.value.as_ref())
    }

    /// True for the all-`None` pseudo-assignment.
    pub fn is_terminal(&self) -> bool {
        self.bindings.iter().all(|binding| binding.value.is_none())
    }

    /// Bound pairs of `self` that are not present in `other`, in `self`'s order.
    pub fn departed_from<'a>(&'a self, other: &Assignment) -> Vec<(&'a str, &'a Value)> {
        self.bindings
            .iter()
            .filter_map(|binding| {
                let value = binding.value.as_ref()?;
                if other.get(&binding.name) == Some(value) {
                    None
                } else {
                    Some((binding.name.as_str(), value))
                }
            })
            .collect()
    }

    /// Bound pairs as an object, for display and logging.
    pub fn to_vars(&self) -> Vars {
        self.bindings
            .iter()
            .filter_map(|binding| {
                binding
                    .value
                    .as_ref()
                    .map(|value| (binding.name.clone(), value.clone()))
            })
            .collect()
    }
}

/// Fully qualified assignment that must never be realized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pairs: BTreeMap<String, Value>,
}

impl Exclusion {
    /// Validates that `pairs` binds every parameter of `parameters` to one of its values.
    pub fn new(
        pairs: BTreeMap<String, Value>,
        parameters: &ParameterSet,
    ) -> Result<Self, CtrError> {
        for (name, value) in &pairs {
            let Some(param) = parameters.get(name) else {
                return Err(CtrError::Validation(
                    ErrorInfo::new("binder.exclude_unknown", "exclusion names an unknown parameter")
                        .with_context("parameter", name),
                ));
            };
            if param.index_of(value).is_none() {
                return Err(CtrError::Validation(
                    ErrorInfo::new(
                        "binder.exclude_value",
                        "exclusion value is not one of the parameter's values",
                    )
                    .with_context("parameter", name)
                    .with_context("value", value.to_string()),
                ));
            }
        }
        if pairs.len() != parameters.len() {
            let missing: Vec<&str> = parameters
                .iter()
                .map(Parameter::name)
                .filter(|name| !pairs.contains_key(*name))
                .collect();
            return Err(CtrError::Validation(
                ErrorInfo::new(
                    "binder.exclude_partial",
                    "exclusions must bind every parameter",
                )
                .with_context("missing", missing.join(",")),
            ));
        }
        Ok(Self { pairs })
    }

    /// True when the pair-set of `assignment` equals this exclusion.
    pub fn matches(&self, assignment: &Assignment) -> bool {
        assignment.bindings().len() == self.pairs.len()
            && assignment.bindings().iter().all(|binding| {
                binding.value.as_ref() == self.pairs.get(&binding.name)
            })
    }
}

/// Lazy Cartesian product over a [`ParameterSet`]; the first (highest cost)
/// parameter varies slowest.
#[derive(Debug)]
pub struct Combinations<'a> {
    parameters: &'a ParameterSet,
    excluded: &'a [Exclusion],
    cursor: Option<Vec<usize>>,
}

impl<'a> Combinations<'a> {
    fn new(parameters: &'a ParameterSet, excluded: &'a [Exclusion]) -> Self {
        let cursor = if parameters.iter().any(|param| param.values().is_empty()) {
            None
        } else {
            Some(vec![0; parameters.len()])
        };
        Self {
            parameters,
            excluded,
            cursor,
        }
    }

    fn current(&self, indices: &[usize]) -> Assignment {
        Assignment::new(
            self.parameters
                .iter()
                .zip(indices)
                .map(|(param, &idx)| Binding {
                    name: param.name().to_string(),
                    value: Some(param.values()[idx].clone()),
                })
                .collect(),
        )
    }

    fn advance(&mut self) {
        let Some(indices) = self.cursor.as_mut() else {
            return;
        };
        for (pos, param) in self.parameters.iter().enumerate().rev() {
            indices[pos] += 1;
            if indices[pos] < param.values().len() {
                return;
            }
            indices[pos] = 0;
        }
        self.cursor = None;
    }
}

impl Iterator for Combinations<'_> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Assignment> {
        loop {
            let assignment = self.current(self.cursor.as_deref()?);
            self.advance();
            if self.excluded.iter().any(|ex| ex.matches(&assignment)) {
                tracing::debug!(combination = ?assignment.to_vars(), "combination excluded");
                continue;
            }
            return Some(assignment);
        }
    }
}

/// Top-level sweep definition: parameters crossed with playbooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binder {
    parameters: ParameterSet,
    playbooks: Vec<PlaybookRef>,
    global_vars: Vars,
    excluded: Vec<Exclusion>,
    inventory: Option<String>,
}

impl Binder {
    /// Builds a binder without exclusions or inventory.
    pub fn new(
        playbooks: Vec<PlaybookRef>,
        global_vars: Vars,
        parameters: Vec<Parameter>,
    ) -> Result<Self, CtrError> {
        Ok(Self {
            parameters: ParameterSet::new(parameters)?,
            playbooks,
            global_vars,
            excluded: Vec::new(),
            inventory: None,
        })
    }

    /// Adds exclusions given as parameter name to value maps.
    pub fn with_exclusions(
        mut self,
        exclusions: Vec<BTreeMap<String, Value>>,
    ) -> Result<Self, CtrError> {
        for pairs in exclusions {
            let exclusion = Exclusion::new(pairs, &self.parameters)?;
            self.excluded.push(exclusion);
        }
        Ok(self)
    }

    /// Sets the inventory passed to every run.
    pub fn with_inventory(mut self, inventory: Option<String>) -> Self {
        self.inventory = inventory;
        self
    }

    /// The validated parameter set.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Playbooks run for every combination, in order.
    pub fn playbooks(&self) -> &[PlaybookRef] {
        &self.playbooks
    }

    /// Variables shared by every run, lowest precedence.
    pub fn global_vars(&self) -> &Vars {
        &self.global_vars
    }

    /// Validated exclusions.
    pub fn excluded(&self) -> &[Exclusion] {
        &self.excluded
    }

    /// Inventory override, if any.
    pub fn inventory(&self) -> Option<&str> {
        self.inventory.as_deref()
    }

    /// Surviving combinations, without transitions.
    pub fn combinations(&self) -> Combinations<'_> {
        self.parameters.combinations(&self.excluded)
    }

    /// Starts a fresh sweep over this binder.
    pub fn sweep(&self) -> Sweep<'_> {
        Sweep::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn param(name: &str, cost: f64, values: Vec<Value>) -> Parameter {
        Parameter::new(name, values, cost, BTreeMap::new(), vec![]).expect("param")
    }

    #[test]
    fn parameters_sort_by_descending_cost_stably() {
        let set = ParameterSet::new(vec![
            param("a", 1.0, vec![json!(1)]),
            param("b", 3.0, vec![json!(1)]),
            param("c", 1.0, vec![json!(1)]),
            param("d", 2.0, vec![json!(1)]),
        ])
        .expect("set");
        let names: Vec<&str> = set.iter().map(Parameter::name).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let err = ParameterSet::new(vec![
            param("a", 1.0, vec![json!(1)]),
            param("a", 2.0, vec![json!(2)]),
        ])
        .expect_err("duplicate");
        assert_eq!(err.info().code, "binder.duplicate_parameter");
    }

    #[test]
    fn combinations_vary_lowest_cost_fastest() {
        let set = ParameterSet::new(vec![
            param("size", 1.0, vec![json!("small"), json!("large")]),
            param("region", 2.0, vec![json!("us"), json!("eu")]),
        ])
        .expect("set");
        let seen: Vec<(Value, Value)> = set
            .combinations(&[])
            .map(|a| (a.get("region").cloned().unwrap(), a.get("size").cloned().unwrap()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (json!("us"), json!("small")),
                (json!("us"), json!("large")),
                (json!("eu"), json!("small")),
                (json!("eu"), json!("large")),
            ]
        );
    }

    #[test]
    fn empty_parameter_empties_the_product() {
        let set = ParameterSet::new(vec![
            param("a", 1.0, vec![json!(1), json!(2)]),
            param("b", 1.0, vec![]),
        ])
        .expect("set");
        assert_eq!(set.cardinality(), Some(0));
        assert_eq!(set.combinations(&[]).count(), 0);
    }

    #[test]
    fn oversized_product_still_iterates() {
        let params = (0..64)
            .map(|idx| param(&format!("p{idx}"), 1.0, vec![json!(0), json!(1)]))
            .collect();
        let set = ParameterSet::new(params).expect("set");
        assert_eq!(set.cardinality(), None);
        let mut combinations = set.combinations(&[]);
        let first = combinations.next().expect("first combination");
        assert_eq!(first.bindings().len(), 64);
        assert!(first.bindings().iter().all(|b| b.value == Some(json!(0))));
        let second = combinations.next().expect("second combination");
        assert_eq!(second.get("p63"), Some(&json!(1)));
    }

    #[test]
    fn no_parameters_yield_one_empty_assignment() {
        let set = ParameterSet::new(vec![]).expect("set");
        let all: Vec<Assignment> = set.combinations(&[]).collect();
        assert_eq!(all.len(), 1);
        assert!(all[0].bindings().is_empty());
    }

    #[test]
    fn partial_exclusions_are_rejected() {
        let binder = Binder::new(
            vec![],
            Vars::new(),
            vec![
                param("a", 1.0, vec![json!(1)]),
                param("b", 1.0, vec![json!(2)]),
            ],
        )
        .expect("binder");
        let err = binder
            .with_exclusions(vec![[("a".to_string(), json!(1))].into()])
            .expect_err("partial");
        assert_eq!(err.info().code, "binder.exclude_partial");
        assert_eq!(err.info().context.get("missing").map(String::as_str), Some("b"));
    }

    #[test]
    fn departed_pairs_include_values_that_vanish() {
        let before = Assignment::new(vec![
            Binding { name: "a".into(), value: Some(json!(1)) },
            Binding { name: "b".into(), value: Some(json!(2)) },
        ]);
        let after = Assignment::new(vec![
            Binding { name: "a".into(), value: Some(json!(1)) },
            Binding { name: "b".into(), value: None },
        ]);
        assert_eq!(before.departed_from(&after), vec![("b", &json!(2))]);
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ctr_core::errors::{CtrError, ErrorInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binder::Binder;
use crate::parameter::{Parameter, PlaybookRef, Vars};

fn parse_error(err: serde_yaml::Error) -> CtrError {
    let mut info = ErrorInfo::new("config.parse", err.to_string());
    if let Some(location) = err.location() {
        info = info
            .with_context("line", location.line().to_string())
            .with_context("column", location.column().to_string());
    }
    CtrError::ConfigParse(info)
}

fn default_cost() -> f64 {
    1.0
}

/// `!playbook` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybookRecord {
    /// Playbook path, resolved against the document directory when relative.
    pub path: String,
    /// Static variables for this playbook.
    #[serde(default)]
    pub vars: Vars,
    /// Tags passed with `--tags`.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `!paramater` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamaterRecord {
    /// Parameter name.
    pub name: String,
    /// Values in declaration order.
    pub values: Vec<Value>,
    /// Pegged variables, aligned with `values`.
    #[serde(default)]
    pub vars: BTreeMap<String, Vec<Value>>,
    /// Expense of changing this parameter.
    #[serde(default = "default_cost")]
    pub cost: f64,
    /// Playbooks fired when this parameter leaves a value.
    #[serde(default)]
    pub transitions: Vec<PlaybookDoc>,
}

/// `!binder` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinderRecord {
    /// Playbooks run for every combination.
    pub playbooks: Vec<PlaybookDoc>,
    /// Global variables.
    #[serde(default)]
    pub vars: Vars,
    /// Swept parameters.
    #[serde(default, alias = "parameters")]
    pub paramaters: Vec<ParamaterDoc>,
    /// Fully qualified combinations to skip.
    #[serde(default)]
    pub exclude: Vec<BTreeMap<String, Value>>,
    /// Inventory passed to every run.
    #[serde(default)]
    pub inventory: Option<String>,
}

/// A node that must carry the `!playbook` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybookDoc {
    /// `!playbook`
    #[serde(rename = "playbook")]
    Playbook(PlaybookRecord),
}

/// A node that must carry the `!paramater` tag (`!parameter` is accepted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamaterDoc {
    /// `!paramater`
    #[serde(rename = "paramater", alias = "parameter")]
    Paramater(ParamaterRecord),
}

/// Any record allowed at the top of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// `!binder`
    #[serde(rename = "binder")]
    Binder(BinderRecord),
    /// `!playbook`
    #[serde(rename = "playbook")]
    Playbook(PlaybookRecord),
    /// `!paramater`
    #[serde(rename = "paramater", alias = "parameter")]
    Paramater(ParamaterRecord),
}

impl Record {
    fn kind(&self) -> &'static str {
        match self {
            Record::Binder(_) => "binder",
            Record::Playbook(_) => "playbook",
            Record::Paramater(_) => "paramater",
        }
    }
}

/// Parses every top level record of a document. The top level may be a
/// single record or a sequence of records.
pub fn parse_records(text: &str) -> Result<Vec<Record>, CtrError> {
    let document: serde_yaml::Value = serde_yaml::from_str(text).map_err(parse_error)?;
    match document {
        serde_yaml::Value::Sequence(items) => items
            .into_iter()
            .map(|item| serde_yaml::from_value(item).map_err(parse_error))
            .collect(),
        serde_yaml::Value::Null => Ok(Vec::new()),
        single => Ok(vec![serde_yaml::from_value(single).map_err(parse_error)?]),
    }
}

fn resolve_path(path: &str, base_dir: &Path) -> String {
    if Path::new(path).is_absolute() || base_dir.as_os_str().is_empty() {
        path.to_string()
    } else {
        base_dir.join(path).to_string_lossy().into_owned()
    }
}

impl PlaybookRecord {
    fn into_ref(self, base_dir: &Path) -> PlaybookRef {
        PlaybookRef::new(resolve_path(&self.path, base_dir))
            .with_vars(self.vars)
            .with_tags(self.tags)
    }
}

impl PlaybookDoc {
    fn into_ref(self, base_dir: &Path) -> PlaybookRef {
        match self {
            PlaybookDoc::Playbook(record) => record.into_ref(base_dir),
        }
    }
}

impl ParamaterRecord {
    fn into_parameter(self, base_dir: &Path) -> Result<Parameter, CtrError> {
        let transitions = self
            .transitions
            .into_iter()
            .map(|doc| doc.into_ref(base_dir))
            .collect();
        Parameter::new(self.name, self.values, self.cost, self.vars, transitions)
    }
}

impl BinderRecord {
    /// Validates the record into a [`Binder`], resolving relative playbook
    /// paths against `base_dir`.
    pub fn into_binder(self, base_dir: &Path) -> Result<Binder, CtrError> {
        let playbooks = self
            .playbooks
            .into_iter()
            .map(|doc| doc.into_ref(base_dir))
            .collect();
        let parameters = self
            .paramaters
            .into_iter()
            .map(|ParamaterDoc::Paramater(record)| record.into_parameter(base_dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Binder::new(playbooks, self.vars, parameters)?
            .with_exclusions(self.exclude)?
            .with_inventory(self.inventory))
    }
}

/// Parses a document and builds its first binder.
pub fn parse_binder_str(text: &str, base_dir: &Path) -> Result<Binder, CtrError> {
    let mut binders = Vec::new();
    for record in parse_records(text)? {
        match record {
            Record::Binder(binder) => binders.push(binder),
            other => tracing::debug!(kind = other.kind(), "ignoring top level record"),
        }
    }
    if binders.len() > 1 {
        tracing::warn!(
            count = binders.len(),
            "more than one binder detected, dropping all but the first"
        );
    }
    let Some(first) = binders.into_iter().next() else {
        return Err(CtrError::Validation(
            ErrorInfo::new("config.no_binder", "document does not define a binder")
                .with_hint("add a top level `!binder` record"),
        ));
    };
    first.into_binder(base_dir)
}

/// Loads the binder document at `path`.
pub fn load_binder<P: AsRef<Path>>(path: P) -> Result<Binder, CtrError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| {
        CtrError::ConfigLoad(
            ErrorInfo::new("config.read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_binder_str(&text, base_dir).map_err(|err| match err {
        CtrError::ConfigParse(info) => {
            CtrError::ConfigParse(info.with_context("path", path.display().to_string()))
        }
        CtrError::Validation(info) => {
            CtrError::Validation(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}

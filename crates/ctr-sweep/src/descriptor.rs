use serde::Serialize;

use crate::binder::{Assignment, Binder};
use crate::hash::{run_fingerprint, Fingerprint};
use crate::merge::merge_vars;
use crate::parameter::{PlaybookRef, Vars};

/// Why a descriptor was emitted. Not part of the run's fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RunRole {
    /// One of the binder's playbooks for the current combination.
    Playbook,
    /// Transition playbook fired because `parameter` left its value.
    Transition {
        /// Parameter whose value changed.
        parameter: String,
    },
}

/// Fully merged, ready to execute unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunDescriptor {
    playbook_path: String,
    inventory: Option<String>,
    tags: Vec<String>,
    vars: Vars,
    role: RunRole,
}

impl RunDescriptor {
    pub(crate) fn build(
        binder: &Binder,
        playbook: &PlaybookRef,
        assignment: &Assignment,
        role: RunRole,
    ) -> Self {
        let vars = merge_vars(
            binder.global_vars(),
            &playbook.static_vars,
            assignment,
            binder.parameters(),
        );
        Self {
            playbook_path: playbook.path.clone(),
            inventory: binder.inventory().map(str::to_string),
            tags: playbook.tags.clone(),
            vars,
            role,
        }
    }

    /// Playbook to execute.
    pub fn playbook_path(&self) -> &str {
        &self.playbook_path
    }

    /// Inventory, if the binder names one.
    pub fn inventory(&self) -> Option<&str> {
        self.inventory.as_deref()
    }

    /// Tags of the source playbook.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Fully merged variables.
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    /// Why this run exists.
    pub fn role(&self) -> &RunRole {
        &self.role
    }

    /// True for transition runs.
    pub fn is_transition(&self) -> bool {
        matches!(self.role, RunRole::Transition { .. })
    }

    /// Cache key over playbook path, sorted tags and merged vars.
    pub fn fingerprint(&self) -> Fingerprint {
        run_fingerprint(&self.playbook_path, &self.tags, &self.vars)
    }
}

use crate::binder::{Assignment, Binder};
use crate::descriptor::{RunDescriptor, RunRole};

/// Compares consecutive assignments and fires transition playbooks for
/// parameters whose bound value departed.
#[derive(Debug, Default)]
pub struct TransitionTracker {
    last: Option<Assignment>,
}

impl TransitionTracker {
    /// Tracker with no previous assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent assignment seen.
    pub fn last(&self) -> Option<&Assignment> {
        self.last.as_ref()
    }

    /// Records `assignment` and returns the transitions leaving the previous one.
    ///
    /// Transition descriptors are merged from the outgoing assignment.
    /// Departed parameters are visited in cost order, then each parameter's
    /// transitions in declaration order.
    pub fn on_next(&mut self, assignment: &Assignment, binder: &Binder) -> Vec<RunDescriptor> {
        let Some(outgoing) = self.last.replace(assignment.clone()) else {
            return Vec::new();
        };
        let mut fired = Vec::new();
        for (name, value) in outgoing.departed_from(assignment) {
            let Some(param) = binder.parameters().get(name) else {
                continue;
            };
            for playbook in param.transitions() {
                tracing::debug!(
                    parameter = name,
                    value = %value,
                    playbook = %playbook.path,
                    "transition fired"
                );
                fired.push(RunDescriptor::build(
                    binder,
                    playbook,
                    &outgoing,
                    RunRole::Transition {
                        parameter: name.to_string(),
                    },
                ));
            }
        }
        fired
    }

    /// Flushes transitions for every parameter still holding a value.
    pub fn finish(mut self, binder: &Binder) -> Vec<RunDescriptor> {
        let terminal = Assignment::terminal(binder.parameters());
        self.on_next(&terminal, binder)
    }
}

use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::binder::{Binder, Combinations};
use crate::descriptor::{RunDescriptor, RunRole};
use crate::transition::TransitionTracker;

/// Single pass stream of run descriptors for one binder.
///
/// For each surviving combination, transitions leaving the previous
/// combination come first, then every binder playbook in order. After the
/// product is exhausted the tracker is flushed once. Dropping the sweep
/// early skips that flush.
#[derive(Debug)]
pub struct Sweep<'a> {
    binder: &'a Binder,
    combinations: Combinations<'a>,
    tracker: Option<TransitionTracker>,
    pending: VecDeque<RunDescriptor>,
}

impl<'a> Sweep<'a> {
    pub(crate) fn new(binder: &'a Binder) -> Self {
        Self {
            binder,
            combinations: binder.combinations(),
            tracker: Some(TransitionTracker::new()),
            pending: VecDeque::new(),
        }
    }

    /// Binder being swept.
    pub fn binder(&self) -> &'a Binder {
        self.binder
    }
}

impl Iterator for Sweep<'_> {
    type Item = RunDescriptor;

    fn next(&mut self) -> Option<RunDescriptor> {
        loop {
            if let Some(descriptor) = self.pending.pop_front() {
                return Some(descriptor);
            }
            let tracker = self.tracker.as_mut()?;
            match self.combinations.next() {
                Some(assignment) => {
                    tracing::debug!(combination = ?assignment.to_vars(), "combination");
                    self.pending.extend(tracker.on_next(&assignment, self.binder));
                    for playbook in self.binder.playbooks() {
                        self.pending.push_back(RunDescriptor::build(
                            self.binder,
                            playbook,
                            &assignment,
                            RunRole::Playbook,
                        ));
                    }
                }
                None => {
                    if let Some(tracker) = self.tracker.take() {
                        self.pending.extend(tracker.finish(self.binder));
                    }
                }
            }
        }
    }
}

impl FusedIterator for Sweep<'_> {}

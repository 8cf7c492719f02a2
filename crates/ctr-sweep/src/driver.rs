use ctr_core::errors::CtrError;
use serde::Serialize;

use crate::cache::{CachedRun, RunCache, RunStatus};
use crate::descriptor::RunDescriptor;
use crate::hash::Fingerprint;

/// External execution capability. Returns the playbook's exit status;
/// `Err` is reserved for failures to launch it at all.
pub trait Runner {
    /// Executes one descriptor and returns its exit status.
    fn run(&mut self, descriptor: &RunDescriptor) -> Result<i32, CtrError>;
}

impl<F> Runner for F
where
    F: FnMut(&RunDescriptor) -> Result<i32, CtrError>,
{
    fn run(&mut self, descriptor: &RunDescriptor) -> Result<i32, CtrError> {
        self(descriptor)
    }
}

/// Options controlling [`drive`].
#[derive(Debug, Clone, Default)]
pub struct DriveOptions {
    /// Re-run descriptors already cached as complete.
    pub force: bool,
}

/// Counts reported by a successful [`drive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriveSummary {
    /// Runs handed to the runner.
    pub executed: usize,
    /// Runs skipped as already complete.
    pub skipped: usize,
}

/// A descriptor rendered with its cache state, for dry runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRun {
    /// Position in the sweep.
    pub index: usize,
    /// Cache key.
    pub fingerprint: Fingerprint,
    /// Cached status when the plan was made.
    pub status: RunStatus,
    /// The run itself.
    pub descriptor: RunDescriptor,
}

/// Pulls every descriptor from `runs` and executes it through `runner`.
///
/// Stops at the first non-zero exit status, which is returned as
/// [`CtrError::Execution`]; nothing further is pulled from `runs`.
pub fn drive<I, R>(
    runs: I,
    cache: &RunCache,
    runner: &mut R,
    opts: &DriveOptions,
) -> Result<DriveSummary, CtrError>
where
    I: IntoIterator<Item = RunDescriptor>,
    R: Runner + ?Sized,
{
    let mut summary = DriveSummary::default();
    for (index, descriptor) in runs.into_iter().enumerate() {
        let run = CachedRun::new(&descriptor);
        if !opts.force && run.status(cache)? == RunStatus::Complete {
            tracing::info!(
                index,
                playbook = descriptor.playbook_path(),
                fingerprint = run.fingerprint().short(),
                "skipping cached run"
            );
            summary.skipped += 1;
            continue;
        }

        tracing::info!(
            index,
            playbook = descriptor.playbook_path(),
            fingerprint = run.fingerprint().short(),
            transition = descriptor.is_transition(),
            "running"
        );
        run.mark(cache, RunStatus::Running)?;
        let exit_code = match runner.run(&descriptor) {
            Ok(code) => code,
            Err(err) => {
                mark_failed(&run, cache, &descriptor);
                tracing::error!(
                    playbook = descriptor.playbook_path(),
                    error = %err,
                    "runner failed"
                );
                return Err(err);
            }
        };
        if exit_code != 0 {
            mark_failed(&run, cache, &descriptor);
            tracing::error!(
                playbook = descriptor.playbook_path(),
                exit_code,
                "there was a problem with the playbook"
            );
            return Err(CtrError::execution(descriptor.playbook_path(), exit_code));
        }
        run.mark(cache, RunStatus::Complete)?;
        summary.executed += 1;
    }
    Ok(summary)
}

// The failure being reported wins over a sentinel write error.
fn mark_failed(run: &CachedRun<'_>, cache: &RunCache, descriptor: &RunDescriptor) {
    if let Err(err) = run.mark(cache, RunStatus::Error) {
        tracing::error!(
            playbook = descriptor.playbook_path(),
            fingerprint = run.fingerprint().short(),
            error = %err,
            "could not record failed run"
        );
    }
}

/// Renders every descriptor of `runs` with its current cache status.
pub fn plan<I>(runs: I, cache: &RunCache) -> Result<Vec<PlannedRun>, CtrError>
where
    I: IntoIterator<Item = RunDescriptor>,
{
    runs.into_iter()
        .enumerate()
        .map(|(index, descriptor)| {
            let fingerprint = descriptor.fingerprint();
            let status = cache.status_of(&fingerprint)?;
            Ok(PlannedRun {
                index,
                fingerprint,
                status,
                descriptor,
            })
        })
        .collect()
}

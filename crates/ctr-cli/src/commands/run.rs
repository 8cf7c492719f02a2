use std::path::PathBuf;

use clap::Args;
use ctr_core::errors::CtrError;
use ctr_sweep::{drive, load_binder, stable_hash_string, DriveOptions, RunCache};

use crate::runner::AnsiblePlaybookRunner;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Binder document describing playbooks and parameters.
    pub binder: PathBuf,
    /// Re-run entries already cached as complete.
    #[arg(long)]
    pub force: bool,
    /// Inventory passed to every run, overriding the binder's.
    #[arg(short, long)]
    pub inventory: Option<String>,
    /// Playbook executable to invoke.
    #[arg(long, default_value = "ansible-playbook")]
    pub ansible_playbook: PathBuf,
}

pub fn run(args: &RunArgs, cache: &RunCache) -> Result<(), CtrError> {
    let mut binder = load_binder(&args.binder)?;
    if args.inventory.is_some() {
        binder = binder.with_inventory(args.inventory.clone());
    }
    let binder_hash = stable_hash_string(&binder)?;
    tracing::info!(
        binder = %binder_hash,
        parameters = binder.parameters().len(),
        playbooks = binder.playbooks().len(),
        cache = %cache.root().display(),
        "starting sweep"
    );
    let mut runner = AnsiblePlaybookRunner::new(&args.ansible_playbook);
    let opts = DriveOptions { force: args.force };
    let summary = drive(binder.sweep(), cache, &mut runner, &opts)?;
    tracing::info!(
        executed = summary.executed,
        skipped = summary.skipped,
        "sweep complete"
    );
    Ok(())
}

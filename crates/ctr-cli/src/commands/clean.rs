use clap::Args;
use ctr_core::errors::CtrError;
use ctr_sweep::RunCache;

#[derive(Args, Debug)]
pub struct CleanArgs {}

pub fn run(_args: &CleanArgs, cache: &RunCache) -> Result<(), CtrError> {
    cache.clean()?;
    tracing::info!(root = %cache.root().display(), "cache removed");
    Ok(())
}

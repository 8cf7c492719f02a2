use std::path::PathBuf;

use clap::Args;
use ctr_core::errors::{CtrError, ErrorInfo};
use ctr_sweep::{load_binder, plan, PlannedRun, RunCache, RunRole};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Binder document describing playbooks and parameters.
    pub binder: PathBuf,
    /// Emit the plan as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &StatusArgs, cache: &RunCache) -> Result<(), CtrError> {
    let binder = load_binder(&args.binder)?;
    let planned = plan(binder.sweep(), cache)?;
    if args.json {
        println!("{}", to_json(&planned)?);
        return Ok(());
    }
    for run in &planned {
        println!("{}", render_line(run)?);
    }
    Ok(())
}

// Vars are BTreeMaps, so the output is already key ordered.
fn to_json<T: Serialize>(value: &T) -> Result<String, CtrError> {
    serde_json::to_string(value)
        .map_err(|err| CtrError::Serde(ErrorInfo::new("serde.json_serialize", err.to_string())))
}

fn role_label(role: &RunRole) -> String {
    match role {
        RunRole::Playbook => "playbook".to_string(),
        RunRole::Transition { parameter } => format!("transition({parameter})"),
    }
}

/// `index  status  role  path  fingerprint  vars`
fn render_line(run: &PlannedRun) -> Result<String, CtrError> {
    Ok(format!(
        "{:>4}  {:<8}  {:<24}  {}  {}  {}",
        run.index,
        run.status.as_str(),
        role_label(run.descriptor.role()),
        run.descriptor.playbook_path(),
        run.fingerprint.short(),
        to_json(run.descriptor.vars())?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctr_sweep::{Binder, Parameter, PlaybookRef, RunStatus, Vars};
    use serde_json::json;

    #[test]
    fn line_lists_path_before_fingerprint() {
        let binder = Binder::new(
            vec![PlaybookRef::new("deploy.yml")],
            Vars::new(),
            vec![Parameter::simple("size", vec![json!("small")]).expect("param")],
        )
        .expect("binder");
        let descriptor = binder.sweep().next().expect("run");
        let run = PlannedRun {
            index: 3,
            fingerprint: descriptor.fingerprint(),
            status: RunStatus::Complete,
            descriptor,
        };
        let line = render_line(&run).expect("line");
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields[0], "3");
        assert_eq!(fields[1], "COMPLETE");
        assert_eq!(fields[2], "playbook");
        assert_eq!(fields[3], "deploy.yml");
        assert_eq!(fields[4], run.fingerprint.short());
        assert_eq!(fields[5], r#"{"size":"small"}"#);
    }
}

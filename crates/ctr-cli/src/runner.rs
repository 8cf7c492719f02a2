use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use ctr_core::errors::{CtrError, ErrorInfo};
use ctr_sweep::{RunDescriptor, Runner};

/// Runs each descriptor through an `ansible-playbook` compatible executable.
#[derive(Debug, Clone)]
pub struct AnsiblePlaybookRunner {
    program: PathBuf,
}

impl AnsiblePlaybookRunner {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    fn arguments(descriptor: &RunDescriptor) -> Result<Vec<OsString>, CtrError> {
        let mut args: Vec<OsString> = vec![descriptor.playbook_path().into()];
        if let Some(inventory) = descriptor.inventory() {
            args.push("-i".into());
            args.push(inventory.into());
        }
        if !descriptor.tags().is_empty() {
            args.push("--tags".into());
            args.push(descriptor.tags().join(",").into());
        }
        let extra_vars = serde_json::to_string(descriptor.vars()).map_err(|err| {
            CtrError::Serde(ErrorInfo::new("runner.extra_vars", err.to_string()))
        })?;
        args.push("--extra-vars".into());
        args.push(extra_vars.into());
        Ok(args)
    }
}

impl Runner for AnsiblePlaybookRunner {
    fn run(&mut self, descriptor: &RunDescriptor) -> Result<i32, CtrError> {
        let args = Self::arguments(descriptor)?;
        tracing::debug!(program = %self.program.display(), ?args, "spawning playbook");
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|err| CtrError::Execution {
                info: ErrorInfo::new("runner.spawn", err.to_string())
                    .with_context("program", self.program.display().to_string())
                    .with_context("playbook", descriptor.playbook_path()),
                exit_code: 1,
            })?;
        // terminated by a signal when there is no code
        Ok(status.code().unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ctr_sweep::{parse_binder_str, Binder, Parameter, PlaybookRef, Vars};
    use serde_json::json;

    use super::*;

    fn first_run(binder: &Binder) -> RunDescriptor {
        binder.sweep().next().expect("run")
    }

    #[test]
    fn arguments_carry_inventory_tags_and_vars() {
        let binder = Binder::new(
            vec![PlaybookRef::new("site.yml").with_tags(vec!["a".into(), "b".into()])],
            Vars::new(),
            vec![Parameter::new(
                "size",
                vec![json!(3)],
                1.0,
                BTreeMap::new(),
                vec![],
            )
            .expect("param")],
        )
        .expect("binder")
        .with_inventory(Some("hosts.ini".into()));
        let args = AnsiblePlaybookRunner::arguments(&first_run(&binder)).expect("args");
        let args: Vec<String> = args
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "site.yml",
                "-i",
                "hosts.ini",
                "--tags",
                "a,b",
                "--extra-vars",
                "{\"size\":3}"
            ]
        );
    }

    #[test]
    fn arguments_omit_absent_inventory_and_tags() {
        let binder =
            parse_binder_str("!binder\nplaybooks: [!playbook {path: p.yml}]\n", Path::new(""))
                .expect("binder");
        let args = AnsiblePlaybookRunner::arguments(&first_run(&binder)).expect("args");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], OsString::from("--extra-vars"));
        assert_eq!(args[2], OsString::from("{}"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_reported() {
        let binder =
            parse_binder_str("!binder\nplaybooks: [!playbook {path: p.yml}]\n", Path::new(""))
                .expect("binder");
        let mut ok = AnsiblePlaybookRunner::new("true");
        assert_eq!(ok.run(&first_run(&binder)).expect("run"), 0);
        let mut failing = AnsiblePlaybookRunner::new("false");
        assert_eq!(failing.run(&first_run(&binder)).expect("run"), 1);
    }

    #[test]
    fn missing_program_is_an_execution_error() {
        let binder =
            parse_binder_str("!binder\nplaybooks: [!playbook {path: p.yml}]\n", Path::new(""))
                .expect("binder");
        let temp = tempfile::tempdir().expect("tmp");
        let mut runner = AnsiblePlaybookRunner::new(temp.path().join("no-such-binary"));
        let err = runner.run(&first_run(&binder)).expect_err("spawn");
        assert_eq!(err.info().code, "runner.spawn");
        assert_eq!(err.exit_code(), 1);
    }
}

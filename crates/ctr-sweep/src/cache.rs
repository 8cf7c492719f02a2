use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ctr_core::errors::{CtrError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::descriptor::RunDescriptor;
use crate::hash::Fingerprint;

/// Cache root used when none is configured.
pub const DEFAULT_CACHE_ROOT: &str = ".ctr_cache";

/// Cached state of a run. `Running` moves to `Complete` or `Error`; both can
/// be overwritten by a fresh `Running` on re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// No sentinel present.
    Unknown,
    /// Started and not yet finished.
    Running,
    /// Finished with exit status 0.
    Complete,
    /// Finished with a failure.
    Error,
}

impl RunStatus {
    /// Sentinel files in the order `status_of` checks them.
    pub const SENTINELS: [RunStatus; 3] =
        [RunStatus::Running, RunStatus::Error, RunStatus::Complete];

    /// Upper case name, also written into the sentinel file.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Unknown => "UNKNOWN",
            RunStatus::Running => "RUNNING",
            RunStatus::Complete => "COMPLETE",
            RunStatus::Error => "ERROR",
        }
    }

    /// File name of the sentinel for this status; `Unknown` has none.
    pub fn sentinel(&self) -> Option<&'static str> {
        match self {
            RunStatus::Unknown => None,
            other => Some(other.as_str()),
        }
    }

    /// True for `Complete` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cache_error(code: &str, path: &Path, err: impl ToString) -> CtrError {
    CtrError::Cache(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Filesystem status store: `<root>/<fingerprint>/<SENTINEL>`.
///
/// Assumes a single writer per root. Two processes calling `set_status` on
/// the same fingerprint may interleave sentinel removal and creation, leaving
/// more than one sentinel behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCache {
    root: PathBuf,
}

impl Default for RunCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ROOT)
    }
}

impl RunCache {
    /// Cache rooted at `root`. Nothing is created until a status is written.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the sentinel for `fingerprint`.
    pub fn entry_dir(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(fingerprint.as_str())
    }

    /// Reads the status for `fingerprint`. A missing entry is `Unknown`.
    pub fn status_of(&self, fingerprint: &Fingerprint) -> Result<RunStatus, CtrError> {
        let dir = self.entry_dir(fingerprint);
        for status in RunStatus::SENTINELS {
            let Some(sentinel) = status.sentinel() else {
                continue;
            };
            let path = dir.join(sentinel);
            if path
                .try_exists()
                .map_err(|err| cache_error("cache.stat", &path, err))?
            {
                return Ok(status);
            }
        }
        Ok(RunStatus::Unknown)
    }

    /// Replaces whatever sentinel exists for `fingerprint` with `status`.
    pub fn set_status(&self, fingerprint: &Fingerprint, status: RunStatus) -> Result<(), CtrError> {
        let dir = self.entry_dir(fingerprint);
        fs::create_dir_all(&dir).map_err(|err| cache_error("cache.entry_dir", &dir, err))?;
        for existing in RunStatus::SENTINELS {
            let Some(sentinel) = existing.sentinel() else {
                continue;
            };
            let path = dir.join(sentinel);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(cache_error("cache.sentinel_remove", &path, err)),
            }
        }
        if let Some(sentinel) = status.sentinel() {
            let path = dir.join(sentinel);
            fs::write(&path, format!("{}\n", status.as_str()))
                .map_err(|err| cache_error("cache.sentinel_write", &path, err))?;
        }
        tracing::trace!(fingerprint = %fingerprint, status = %status, "status written");
        Ok(())
    }

    /// Deletes the whole cache root. A missing root is not an error.
    pub fn clean(&self) -> Result<(), CtrError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(cache_error("cache.clean", &self.root, err)),
        }
    }
}

/// A descriptor paired with its cache key.
#[derive(Debug, Clone)]
pub struct CachedRun<'a> {
    descriptor: &'a RunDescriptor,
    fingerprint: Fingerprint,
}

impl<'a> CachedRun<'a> {
    /// Computes the descriptor's fingerprint.
    pub fn new(descriptor: &'a RunDescriptor) -> Self {
        Self {
            fingerprint: descriptor.fingerprint(),
            descriptor,
        }
    }

    /// The wrapped descriptor.
    pub fn descriptor(&self) -> &'a RunDescriptor {
        self.descriptor
    }

    /// Cache key of the descriptor.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Current status in `cache`.
    pub fn status(&self, cache: &RunCache) -> Result<RunStatus, CtrError> {
        cache.status_of(&self.fingerprint)
    }

    /// Writes `status` for this run.
    pub fn mark(&self, cache: &RunCache, status: RunStatus) -> Result<(), CtrError> {
        cache.set_status(&self.fingerprint, status)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::hash::fingerprint;

    fn sentinels(cache: &RunCache, fp: &Fingerprint) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(cache.entry_dir(fp))
            .expect("entry dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn missing_entry_is_unknown() {
        let temp = tempfile::tempdir().expect("tmp");
        let cache = RunCache::new(temp.path().join("cache"));
        let fp = fingerprint(&json!({"a": 1}).into());
        assert_eq!(cache.status_of(&fp).expect("status"), RunStatus::Unknown);
    }

    #[test]
    fn only_one_sentinel_survives_a_status_change() {
        let temp = tempfile::tempdir().expect("tmp");
        let cache = RunCache::new(temp.path());
        let fp = fingerprint(&json!("run").into());
        cache.set_status(&fp, RunStatus::Complete).expect("complete");
        cache.set_status(&fp, RunStatus::Error).expect("error");
        assert_eq!(sentinels(&cache, &fp), vec!["ERROR".to_string()]);
        assert_eq!(cache.status_of(&fp).expect("status"), RunStatus::Error);
        let contents = fs::read_to_string(cache.entry_dir(&fp).join("ERROR")).expect("read");
        assert_eq!(contents, "ERROR\n");
    }

    #[test]
    fn terminal_states_can_be_rerun() {
        let temp = tempfile::tempdir().expect("tmp");
        let cache = RunCache::new(temp.path());
        let fp = fingerprint(&json!([1, 2]).into());
        for status in [RunStatus::Running, RunStatus::Complete, RunStatus::Running] {
            cache.set_status(&fp, status).expect("set");
            assert_eq!(cache.status_of(&fp).expect("status"), status);
        }
        assert_eq!(sentinels(&cache, &fp), vec!["RUNNING".to_string()]);
    }

    #[test]
    fn unknown_clears_sentinels() {
        let temp = tempfile::tempdir().expect("tmp");
        let cache = RunCache::new(temp.path());
        let fp = fingerprint(&json!(7).into());
        cache.set_status(&fp, RunStatus::Complete).expect("complete");
        cache.set_status(&fp, RunStatus::Unknown).expect("unknown");
        assert!(sentinels(&cache, &fp).is_empty());
        assert_eq!(cache.status_of(&fp).expect("status"), RunStatus::Unknown);
    }

    #[test]
    fn clean_removes_root_and_tolerates_absence() {
        let temp = tempfile::tempdir().expect("tmp");
        let cache = RunCache::new(temp.path().join("cache"));
        let fp = fingerprint(&json!(1).into());
        cache.set_status(&fp, RunStatus::Running).expect("set");
        cache.clean().expect("clean");
        assert!(!cache.root().exists());
        cache.clean().expect("clean twice");
    }
}

//! Parameter sweep and transition engine with a content addressed run cache.

#![deny(missing_docs)]

mod binder;
mod cache;
mod config;
mod descriptor;
mod driver;
mod hash;
mod merge;
mod parameter;
mod sweep;
mod transition;

pub use binder::{Assignment, Binder, Binding, Combinations, Exclusion, ParameterSet};
pub use cache::{CachedRun, RunCache, RunStatus, DEFAULT_CACHE_ROOT};
pub use config::{
    load_binder, parse_binder_str, parse_records, BinderRecord, ParamaterDoc, ParamaterRecord,
    PlaybookDoc, PlaybookRecord, Record,
};
pub use descriptor::{RunDescriptor, RunRole};
pub use driver::{drive, plan, DriveOptions, DriveSummary, PlannedRun, Runner};
pub use hash::{fingerprint, run_fingerprint, stable_hash_string, Fingerprint, Structure};
pub use merge::merge_vars;
pub use parameter::{Parameter, PlaybookRef, Vars};
pub use sweep::Sweep;
pub use transition::TransitionTracker;


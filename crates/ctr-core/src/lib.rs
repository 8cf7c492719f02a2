#![deny(missing_docs)]
#![doc = "Core types shared by the cluster test runner crates."]

pub mod errors;

pub use errors::{CtrError, ErrorInfo};

//! Structured error types shared across ctr crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`CtrError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, parameter names, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the cluster test runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CtrError {
    /// The configuration document could not be read.
    #[error("config load error: {0}")]
    ConfigLoad(ErrorInfo),
    /// The configuration document is malformed.
    #[error("config parse error: {0}")]
    ConfigParse(ErrorInfo),
    /// The configuration parsed but violates a structural rule.
    #[error("validation error: {0}")]
    Validation(ErrorInfo),
    /// An external runner reported a non-zero exit status.
    #[error("execution error: {info}")]
    Execution {
        /// Diagnostic payload naming the failed run.
        info: ErrorInfo,
        /// Exit status reported by the runner, surfaced unchanged.
        exit_code: i32,
    },
    /// Run cache filesystem errors.
    #[error("cache error: {0}")]
    Cache(ErrorInfo),
    /// Serialization errors outside of configuration parsing.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl CtrError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CtrError::ConfigLoad(info)
            | CtrError::ConfigParse(info)
            | CtrError::Validation(info)
            | CtrError::Cache(info)
            | CtrError::Serde(info) => info,
            CtrError::Execution { info, .. } => info,
        }
    }

    /// Builds an execution error for a playbook that exited with `exit_code`.
    pub fn execution(playbook: impl Into<String>, exit_code: i32) -> Self {
        CtrError::Execution {
            info: ErrorInfo::new("runner.exit_status", "playbook exited with a non-zero status")
                .with_context("playbook", playbook)
                .with_context("exit_code", exit_code.to_string()),
            exit_code,
        }
    }

    /// Process exit status for this error: the runner's own code for
    /// execution failures and `1` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CtrError::Execution { exit_code, .. } => *exit_code,
            _ => 1,
        }
    }
}

//! Public configuration and result types.

use serde::Deserialize;
use std::time::Duration;

use perlcheck_types::Diagnostic;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SUPERSEDE_GRACE_MS: u64 = 2000;

fn default_executable() -> String {
    String::from("perl")
}

fn default_check_flag() -> String {
    String::from("-c")
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_supersede_grace_ms() -> u64 {
    DEFAULT_SUPERSEDE_GRACE_MS
}

/// How to invoke the external checker.
///
/// Immutable for the lifetime of a [`Linter`](crate::Linter).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CheckerConfig {
    /// Interpreter executable, resolved through `PATH` when not a path.
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Syntax-check-only flag. Always the first argument.
    #[serde(default = "default_check_flag")]
    pub check_flag: String,
    /// Extra interpreter options, passed after the check flag.
    #[serde(default)]
    pub options: Vec<String>,
    /// Absolute module search paths, each passed as `-I<path>`.
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Workspace-relative module search paths, passed as `-I<root>/<path>`.
    #[serde(default)]
    pub relative_include_paths: Vec<String>,
    /// Source fragments written to the checker before the document text.
    #[serde(default)]
    pub prepend_code: Vec<String>,
    /// Working directory for the checker, relative to the workspace root.
    #[serde(default)]
    pub cwd: Option<String>,
    /// Upper bound on a checker's lifetime. 0 disables the bound.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How long a superseded checker may ignore its interrupt before it is killed.
    #[serde(default = "default_supersede_grace_ms")]
    pub supersede_grace_ms: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            check_flag: default_check_flag(),
            options: Vec::new(),
            include_paths: Vec::new(),
            relative_include_paths: Vec::new(),
            prepend_code: Vec::new(),
            cwd: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            supersede_grace_ms: DEFAULT_SUPERSEDE_GRACE_MS,
        }
    }
}

impl CheckerConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    #[must_use]
    pub fn supersede_grace(&self) -> Duration {
        Duration::from_millis(self.supersede_grace_ms)
    }
}

/// How a lint session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintOutcome {
    /// The checker exited; diagnostics are in the order they were reported.
    Completed(Vec<Diagnostic>),
    /// A newer request for the same document (or a cancel) replaced this session.
    /// Whatever the old checker reported is discarded.
    Superseded,
}

impl LintOutcome {
    /// Diagnostics of a completed session, `None` when superseded.
    #[must_use]
    pub fn into_diagnostics(self) -> Option<Vec<Diagnostic>> {
        match self {
            Self::Completed(items) => Some(items),
            Self::Superseded => None,
        }
    }
}

//! Check invoker: builds the checker command line and input payload.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};

use crate::types::CheckerConfig;

/// Terminates the checker's input after the document text.
pub(crate) const END_OF_TRANSMISSION: u8 = 0x04;

/// Immutable parameters for launching the checker against one workspace.
#[derive(Debug, Clone)]
pub struct CheckInvocation {
    executable: String,
    /// `executable` looked up in `PATH` once, when the invocation is built.
    program: Option<PathBuf>,
    check_flag: String,
    options: Vec<String>,
    include_paths: Vec<String>,
    relative_include_paths: Vec<String>,
    prepend_code: String,
    workspace_root: PathBuf,
    cwd: Option<String>,
}

/// A freshly spawned checker with its pipes detached from the handle.
pub(crate) struct SpawnedChecker {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stderr: ChildStderr,
}

impl CheckInvocation {
    #[must_use]
    pub fn new(config: &CheckerConfig, workspace_root: &Path) -> Self {
        Self {
            executable: config.executable.clone(),
            program: which::which(&config.executable).ok(),
            check_flag: config.check_flag.clone(),
            options: config.options.clone(),
            include_paths: config.include_paths.clone(),
            relative_include_paths: config.relative_include_paths.clone(),
            prepend_code: config.prepend_code.concat(),
            workspace_root: workspace_root.to_path_buf(),
            cwd: config.cwd.clone(),
        }
    }

    /// Argument vector: check flag, options, absolute `-I`s, then workspace `-I`s.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let root = self.workspace_root.display();
        let mut args = Vec::with_capacity(
            1 + self.options.len() + self.include_paths.len() + self.relative_include_paths.len(),
        );
        args.push(self.check_flag.clone());
        args.extend(self.options.iter().cloned());
        args.extend(self.include_paths.iter().map(|path| format!("-I{path}")));
        args.extend(
            self.relative_include_paths
                .iter()
                .map(|path| format!("-I{root}/{path}")),
        );
        args
    }

    /// Bytes written to the checker: prepended code, the document, then EOT.
    #[must_use]
    pub fn stdin_payload(&self, text: &str) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.prepend_code.len() + text.len() + 1);
        payload.extend_from_slice(self.prepend_code.as_bytes());
        payload.extend_from_slice(text.as_bytes());
        payload.push(END_OF_TRANSMISSION);
        payload
    }

    /// Working directory override, if configured and present on disk.
    ///
    /// A missing directory is not fatal: the checker runs in the inherited
    /// directory instead.
    #[must_use]
    pub fn working_dir(&self) -> Option<PathBuf> {
        let cwd = self.cwd.as_deref()?;
        let dir = self.workspace_root.join(cwd);
        if dir.is_dir() {
            Some(dir)
        } else {
            tracing::warn!(
                dir = %dir.display(),
                "Checker working directory does not exist; using inherited directory"
            );
            None
        }
    }

    /// Launch the checker. Must be called from within a Tokio runtime.
    pub(crate) fn spawn(&self) -> Result<SpawnedChecker> {
        let program = self
            .program
            .as_deref()
            .with_context(|| format!("{} not found in PATH", self.executable))?;

        let mut cmd = Command::new(program);
        cmd.args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.working_dir() {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", program.display()))?;

        let stdin = child.stdin.take().context("no stdin from child")?;
        let stderr = child.stderr.take().context("no stderr from child")?;

        Ok(SpawnedChecker {
            child,
            stdin,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CheckerConfig {
        CheckerConfig {
            executable: "perl".to_string(),
            options: vec!["-T".to_string(), "-Mstrict".to_string()],
            include_paths: vec!["/opt/perl/lib".to_string(), "/usr/share/perl5".to_string()],
            relative_include_paths: vec!["lib".to_string(), "local/lib/perl5".to_string()],
            prepend_code: vec!["use warnings;\n".to_string(), "use utf8;\n".to_string()],
            ..CheckerConfig::default()
        }
    }

    #[test]
    fn test_args_order() {
        let invocation = CheckInvocation::new(&test_config(), Path::new("/work/space"));
        assert_eq!(
            invocation.args(),
            vec![
                "-c",
                "-T",
                "-Mstrict",
                "-I/opt/perl/lib",
                "-I/usr/share/perl5",
                "-I/work/space/lib",
                "-I/work/space/local/lib/perl5",
            ]
        );
    }

    #[test]
    fn test_args_minimal() {
        let invocation = CheckInvocation::new(&CheckerConfig::default(), Path::new("/ws"));
        assert_eq!(invocation.args(), vec!["-c"]);
    }

    #[test]
    fn test_stdin_payload_prepends_and_terminates() {
        let invocation = CheckInvocation::new(&test_config(), Path::new("/ws"));
        let payload = invocation.stdin_payload("print 1;\n");
        assert_eq!(payload, b"use warnings;\nuse utf8;\nprint 1;\n\x04".to_vec());
    }

    #[test]
    fn test_stdin_payload_empty_document() {
        let invocation = CheckInvocation::new(&CheckerConfig::default(), Path::new("/ws"));
        assert_eq!(invocation.stdin_payload(""), vec![END_OF_TRANSMISSION]);
    }

    #[test]
    fn test_working_dir_unset() {
        let invocation = CheckInvocation::new(&CheckerConfig::default(), Path::new("/ws"));
        assert!(invocation.working_dir().is_none());
    }

    #[test]
    fn test_working_dir_existing() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("t")).unwrap();
        let config = CheckerConfig {
            cwd: Some("t".to_string()),
            ..CheckerConfig::default()
        };
        let invocation = CheckInvocation::new(&config, root.path());
        assert_eq!(invocation.working_dir(), Some(root.path().join("t")));
    }

    #[test]
    fn test_working_dir_missing_falls_back() {
        let root = tempfile::tempdir().unwrap();
        let config = CheckerConfig {
            cwd: Some("does-not-exist".to_string()),
            ..CheckerConfig::default()
        };
        let invocation = CheckInvocation::new(&config, root.path());
        assert!(invocation.working_dir().is_none());
    }

    #[test]
    fn test_executable_resolved_once_at_construction() {
        let config = CheckerConfig {
            executable: "sh".to_string(),
            ..CheckerConfig::default()
        };
        let invocation = CheckInvocation::new(&config, Path::new("/"));
        let program = invocation.program.as_deref().expect("sh should be on PATH");
        assert!(program.is_absolute());
        assert!(program.ends_with("sh"));

        let missing = CheckerConfig {
            executable: "perlcheck-no-such-interpreter".to_string(),
            ..CheckerConfig::default()
        };
        assert!(CheckInvocation::new(&missing, Path::new("/")).program.is_none());
    }

    #[tokio::test]
    async fn test_spawn_unknown_executable_fails() {
        let config = CheckerConfig {
            executable: "perlcheck-no-such-interpreter".to_string(),
            ..CheckerConfig::default()
        };
        let invocation = CheckInvocation::new(&config, Path::new("/"));
        let err = invocation.spawn().err().expect("spawn should fail");
        assert!(format!("{err:#}").contains("perlcheck-no-such-interpreter"));
    }
}

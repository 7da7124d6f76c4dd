//! perlcheck CLI - syntax-check perl files and print positioned diagnostics.
//!
//! ```text
//! main() -> load config -> Linter::lint(file) per file -> await tickets
//!                                                           |
//!                                                           v
//!                                       DiagnosticsStore -> text | json
//! ```
//!
//! Exit status: 0 when every file is clean, 1 when diagnostics were reported,
//! 2 when the run itself failed.

mod report;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::io::{Write, stdout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{env, fs};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use perlcheck_config::PerlcheckConfig;
use perlcheck_lint::{CheckerConfig, DiagnosticsStore, LintOutcome, Linter, protocol};

use crate::report::CheckedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `path:line:col: error: message`
    Text,
    /// One `textDocument/publishDiagnostics` notification per file.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "perlcheck", version, about)]
struct Args {
    /// Files to check.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Config file. Defaults to `<workspace>/.perlcheck.toml`, then `~/.perlcheck/config.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Workspace root for relative include paths and the working directory.
    #[arg(long)]
    workspace: Option<PathBuf>,
    /// Interpreter to run instead of the configured one.
    #[arg(long)]
    perl: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Stdout carries the report; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(args).await {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(e) => {
            eprintln!("perlcheck: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether any diagnostics were reported.
async fn run(args: Args) -> Result<bool> {
    let workspace = match &args.workspace {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("determining current directory")?,
    };
    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("resolving workspace {}", workspace.display()))?;

    let mut checker = load_checker_config(args.config.as_deref(), &workspace)?;
    if let Some(perl) = args.perl {
        checker.executable = perl;
    }

    let files = collect_files(&args.files)?;
    let linter = Linter::new(&checker, &workspace);

    let mut tickets = Vec::with_capacity(files.len());
    for file in &files {
        let text = fs::read_to_string(&file.path)
            .with_context(|| format!("reading {}", file.path.display()))?;
        let ticket = linter
            .lint(&file.uri, &text)
            .with_context(|| format!("checking {}", file.path.display()))?;
        tickets.push(ticket);
    }

    let mut store = DiagnosticsStore::new();
    for ticket in tickets {
        let uri = ticket.uri().to_string();
        match ticket
            .await
            .with_context(|| format!("checking {uri}"))?
        {
            LintOutcome::Completed(items) => store.update(uri, items),
            LintOutcome::Superseded => {
                tracing::debug!(uri = %uri, "Check superseded");
            }
        }
    }

    let snapshot = store.snapshot();
    let mut out = stdout().lock();
    match args.format {
        OutputFormat::Text => {
            report::write_text(&mut out, &files, &store)?;
            report::write_summary(&mut std::io::stderr(), files.len(), &snapshot)?;
        }
        OutputFormat::Json => {
            for file in &files {
                let items = store.get(&file.uri).unwrap_or_default();
                let notification = protocol::publish_diagnostics(&file.uri, items);
                writeln!(out, "{}", serde_json::to_string(&notification)?)?;
            }
        }
    }
    out.flush()?;

    Ok(!snapshot.is_empty())
}

fn load_checker_config(explicit: Option<&Path>, workspace: &Path) -> Result<CheckerConfig> {
    let config = match explicit {
        Some(path) => Some(PerlcheckConfig::load_from(path)?),
        None => PerlcheckConfig::load_default(workspace)?,
    };
    Ok(config.map(PerlcheckConfig::checker_or_default).unwrap_or_default())
}

/// Canonicalize and de-duplicate the requested files, keeping their order.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<CheckedFile>> {
    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        if !absolute.is_file() {
            bail!("{} is not a file", path.display());
        }
        let uri = protocol::path_to_file_uri(&absolute)?.to_string();
        if seen.insert(uri.clone()) {
            files.push(CheckedFile {
                path: path.clone(),
                uri,
            });
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_defaults() {
        let args = Args::try_parse_from(["perlcheck", "lib/Foo.pm"]).unwrap();
        assert_eq!(args.files, vec![PathBuf::from("lib/Foo.pm")]);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.config.is_none());
        assert!(args.perl.is_none());
    }

    #[test]
    fn args_require_a_file() {
        assert!(Args::try_parse_from(["perlcheck"]).is_err());
    }

    #[test]
    fn args_parse_json_format() {
        let args = Args::try_parse_from([
            "perlcheck",
            "--format",
            "json",
            "--perl",
            "/usr/bin/perl",
            "a.pl",
            "b.pl",
        ])
        .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.perl.as_deref(), Some("/usr/bin/perl"));
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn collect_files_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pl");
        fs::write(&file, "1;\n").unwrap();
        let files = collect_files(&[file.clone(), file.clone()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].uri.starts_with("file://"));
        assert_eq!(files[0].path, file);
    }

    #[test]
    fn collect_files_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_files(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(err.to_string().contains("is not a file"));
    }

    #[test]
    fn load_checker_config_without_files_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("perlcheck.toml");
        fs::write(&explicit, "").unwrap();
        let checker = load_checker_config(Some(&explicit), dir.path()).unwrap();
        assert_eq!(checker, CheckerConfig::default());
    }
}

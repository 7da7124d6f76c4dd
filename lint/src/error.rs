use std::io;

/// Failures surfaced by a lint request.
///
/// Everything else (unparseable checker lines, a missing working directory,
/// a superseded session) degrades to fewer diagnostics instead of an error.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// The checker could not be resolved or launched.
    #[error("failed to start checker: {0:#}")]
    Spawn(anyhow::Error),
    /// Writing the document to the checker failed and the session ended with
    /// no diagnostics. Judged once the error stream is drained, so output
    /// arriving after the write error still turns this into a normal result.
    #[error("no diagnostics were produced on checker exit: {0}")]
    Input(#[source] io::Error),
    /// The session task went away without resolving its ticket.
    #[error("lint session ended without reporting a result")]
    SessionLost,
}

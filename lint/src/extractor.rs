//! Diagnostic extraction from the checker's error stream.
//!
//! The stream arrives in arbitrary chunks. Partial lines are buffered until
//! their newline shows up (or the stream ends), so a diagnostic split across
//! two reads is still recognised.

use std::sync::LazyLock;

use regex::Regex;

use perlcheck_types::Diagnostic;

/// `... at - line 12, near "foo"` / `... at - line 12.`
static LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"line (\d+)[.,]").expect("valid line number regex"));

/// The checker's own notice when it stops after too many errors.
const TOO_MANY_ERRORS_SUFFIX: &str = "has too many errors.";

/// Incremental parser turning checker error output into diagnostics.
#[derive(Debug, Default)]
pub struct DiagnosticExtractor {
    /// Bytes after the last newline seen so far.
    pending: Vec<u8>,
    /// 0-based line of the most recent line-numbered diagnostic.
    last_error_line: u32,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of error output.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            let line = String::from_utf8_lossy(&self.pending[consumed..end]).into_owned();
            self.process_line(line);
            consumed = end + 1;
        }
        self.pending.drain(..consumed);
    }

    /// Flush an unterminated final line and return diagnostics in report order.
    #[must_use]
    pub fn finish(mut self) -> Vec<Diagnostic> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(line);
        }
        self.diagnostics
    }

    fn process_line(&mut self, mut line: String) {
        if line.ends_with('\r') {
            line.pop();
        }

        if let Some(line_number) = parse_line_number(&line) {
            self.last_error_line = line_number;
            self.diagnostics
                .push(Diagnostic::error_on_line(line_number, line.clone()));
        }

        if line.ends_with(TOO_MANY_ERRORS_SUFFIX) {
            self.diagnostics
                .push(Diagnostic::error_on_line(self.last_error_line, line));
        }
    }
}

/// 0-based document line referenced by a checker message, if any.
///
/// The checker counts from 1. "line 0" and numbers beyond `u32` are misses.
fn parse_line_number(line: &str) -> Option<u32> {
    LINE_PATTERN
        .captures(line)?
        .get(1)?
        .as_str()
        .parse::<u32>()
        .ok()?
        .checked_sub(1)
}

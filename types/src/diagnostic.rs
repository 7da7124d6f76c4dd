use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Severity
// ============================================================================

/// Severity level for a diagnostic.
///
/// The checker bridge only ever produces [`DiagnosticSeverity::Error`]; the
/// remaining levels mirror the editor protocol's severity space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    /// LSP numeric severity (1=Error, 2=Warning, 3=Info, 4=Hint).
    #[must_use]
    pub fn as_lsp(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

// ============================================================================
// Positions
// ============================================================================

/// A zero-based document position, serialized in LSP shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    /// Column in UTF-16 code units.
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

// ============================================================================
// Diagnostic
// ============================================================================

/// A position-anchored message recovered from the checker's error output.
///
/// Fields are private; consumers read via accessors so a diagnostic cannot be
/// edited after the extractor produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    range: Range,
    severity: DiagnosticSeverity,
    message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(range: Range, severity: DiagnosticSeverity, message: String) -> Self {
        Self {
            range,
            severity,
            message,
        }
    }

    /// An error spanning a whole line: `(line, 0)` to `(line, len(message))`.
    ///
    /// The end column counts UTF-16 code units, the editor protocol's default
    /// position encoding.
    #[must_use]
    pub fn error_on_line(line: u32, message: String) -> Self {
        let width = u32::try_from(message.encode_utf16().count()).unwrap_or(u32::MAX);
        Self::new(
            Range::new(Position::new(line, 0), Position::new(line, width)),
            DiagnosticSeverity::Error,
            message,
        )
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 0-indexed start line.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.range.start.line
    }

    /// 0-indexed start column.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.range.start.character
    }

    /// Format as `path:line:col: severity: message` (1-indexed for display).
    #[must_use]
    pub fn display_with_path(&self, path: &Path) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            path.display(),
            self.line() + 1,
            self.col() + 1,
            self.severity.label(),
            self.message,
        )
    }
}

//! Per-document syntax-check sessions against an external perl interpreter.
//!
//! A [`Linter`] pipes document text into `perl -c`, parses the interpreter's
//! error stream into positioned [`Diagnostic`]s, and keeps at most one live
//! checker process per document URI.

pub mod protocol;
pub mod types;

pub(crate) mod extractor;
pub(crate) mod invoker;
pub(crate) mod session;

mod error;
mod linter;
mod store;

pub use error::LintError;
pub use extractor::DiagnosticExtractor;
pub use invoker::CheckInvocation;
pub use linter::{LintTicket, Linter};
pub use perlcheck_types::{Diagnostic, DiagnosticSeverity, DiagnosticsSnapshot, Position, Range};
pub use store::DiagnosticsStore;
pub use types::{CheckerConfig, LintOutcome};

//! Core diagnostic types for perlcheck.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The checker core produces [`Diagnostic`]s; the editor-protocol layer and the CLI
//! consume them.

mod diagnostic;
mod snapshot;

pub use diagnostic::{Diagnostic, DiagnosticSeverity, Position, Range};
pub use snapshot::DiagnosticsSnapshot;

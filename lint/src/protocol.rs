//! Editor-protocol (LSP) message shapes for publishing checker diagnostics.

use std::path::{Path, PathBuf};

use serde::Serialize;

use perlcheck_types::{Diagnostic, Range};

/// `source` field attached to every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "perl";

const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct Notification<P> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: P,
}

impl<P> Notification<P> {
    pub fn new(method: &'static str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    pub diagnostics: Vec<LspDiagnostic>,
}

#[derive(Debug, Serialize)]
pub struct LspDiagnostic {
    pub range: Range,
    pub severity: u8,
    pub source: &'static str,
    pub message: String,
}

impl From<&Diagnostic> for LspDiagnostic {
    fn from(diag: &Diagnostic) -> Self {
        Self {
            range: diag.range(),
            severity: diag.severity().as_lsp(),
            source: DIAGNOSTIC_SOURCE,
            message: diag.message().to_string(),
        }
    }
}

/// A complete `textDocument/publishDiagnostics` notification for `uri`.
///
/// An empty `diagnostics` slice clears the document's diagnostics in the editor.
#[must_use]
pub fn publish_diagnostics(uri: &str, diagnostics: &[Diagnostic]) -> serde_json::Value {
    let params = PublishDiagnosticsParams {
        uri: uri.to_string(),
        diagnostics: diagnostics.iter().map(LspDiagnostic::from).collect(),
    };
    serde_json::json!(Notification::new(PUBLISH_DIAGNOSTICS, params))
}

pub fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

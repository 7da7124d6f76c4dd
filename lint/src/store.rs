//! Diagnostics store: latest completed result per document.

use std::collections::HashMap;

use perlcheck_types::{Diagnostic, DiagnosticsSnapshot};

#[derive(Debug, Default)]
pub struct DiagnosticsStore {
    data: HashMap<String, Vec<Diagnostic>>,
}

impl DiagnosticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the diagnostics for `uri`. An empty list clears the entry.
    pub fn update(&mut self, uri: String, items: Vec<Diagnostic>) {
        if items.is_empty() {
            self.data.remove(&uri);
        } else {
            self.data.insert(uri, items);
        }
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&[Diagnostic]> {
        self.data.get(uri).map(Vec::as_slice)
    }

    /// Documents with errors first, then by URI.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let mut files: Vec<(String, Vec<Diagnostic>)> = self
            .data
            .iter()
            .map(|(uri, items)| (uri.clone(), items.clone()))
            .collect();

        files.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(|d| d.severity().is_error());
            let b_has_errors = b.1.iter().any(|d| d.severity().is_error());
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });

        DiagnosticsSnapshot::new(files)
    }
}

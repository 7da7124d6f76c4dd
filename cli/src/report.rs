//! Human-readable output.

use std::io::{self, Write};
use std::path::PathBuf;

use perlcheck_lint::{DiagnosticsSnapshot, DiagnosticsStore};

/// A file named on the command line and the URI it is linted under.
#[derive(Debug, Clone)]
pub struct CheckedFile {
    /// As given by the user, for display.
    pub path: PathBuf,
    pub uri: String,
}

/// One `path:line:col: error: message` line per diagnostic, files in argument order.
pub fn write_text(
    out: &mut impl Write,
    files: &[CheckedFile],
    store: &DiagnosticsStore,
) -> io::Result<()> {
    for file in files {
        for diag in store.get(&file.uri).unwrap_or_default() {
            writeln!(out, "{}", diag.display_with_path(&file.path))?;
        }
    }
    Ok(())
}

/// `N files checked, syntax OK` or `N files checked, D diagnostics in F files (E:n)`.
pub fn write_summary(
    out: &mut impl Write,
    checked: usize,
    snapshot: &DiagnosticsSnapshot,
) -> io::Result<()> {
    if snapshot.is_empty() {
        return writeln!(out, "{checked} {} checked, syntax OK", files_noun(checked));
    }
    let total = snapshot.total_count();
    let failing = snapshot.files().len();
    writeln!(
        out,
        "{checked} {} checked, {total} {} in {failing} {} ({})",
        files_noun(checked),
        if total == 1 { "diagnostic" } else { "diagnostics" },
        files_noun(failing),
        snapshot.status_string()
    )
}

fn files_noun(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perlcheck_lint::Diagnostic;

    fn checked(path: &str) -> CheckedFile {
        CheckedFile {
            path: PathBuf::from(path),
            uri: format!("file:///ws/{path}"),
        }
    }

    fn render_text(files: &[CheckedFile], store: &DiagnosticsStore) -> String {
        let mut buf = Vec::new();
        write_text(&mut buf, files, store).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_lists_diagnostics_in_argument_order() {
        let files = vec![checked("b.pl"), checked("a.pl")];
        let mut store = DiagnosticsStore::new();
        store.update(
            files[1].uri.clone(),
            vec![Diagnostic::error_on_line(
                0,
                "syntax error at - line 1, near \"=>\"".to_string(),
            )],
        );
        store.update(
            files[0].uri.clone(),
            vec![
                Diagnostic::error_on_line(4, "Missing right curly at - line 5.".to_string()),
                Diagnostic::error_on_line(4, "- has too many errors.".to_string()),
            ],
        );

        assert_eq!(
            render_text(&files, &store),
            "b.pl:5:1: error: Missing right curly at - line 5.\n\
             b.pl:5:1: error: - has too many errors.\n\
             a.pl:1:1: error: syntax error at - line 1, near \"=>\"\n"
        );
    }

    #[test]
    fn text_is_empty_for_clean_files() {
        let files = vec![checked("a.pl")];
        assert_eq!(render_text(&files, &DiagnosticsStore::new()), "");
    }

    #[test]
    fn summary_clean() {
        let mut buf = Vec::new();
        write_summary(&mut buf, 1, &DiagnosticsSnapshot::default()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1 file checked, syntax OK\n");
    }

    #[test]
    fn summary_with_errors() {
        let mut store = DiagnosticsStore::new();
        store.update(
            "file:///ws/a.pl".to_string(),
            vec![Diagnostic::error_on_line(0, "x at - line 1.".to_string())],
        );
        let mut buf = Vec::new();
        write_summary(&mut buf, 3, &store.snapshot()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "3 files checked, 1 diagnostic in 1 file (E:1)\n"
        );
    }

    #[test]
    fn summary_counts_every_diagnostic() {
        let mut store = DiagnosticsStore::new();
        store.update(
            "file:///ws/a.pl".to_string(),
            vec![
                Diagnostic::error_on_line(4, "Missing right curly at - line 5.".to_string()),
                Diagnostic::error_on_line(4, "- has too many errors.".to_string()),
            ],
        );
        store.update(
            "file:///ws/b.pl".to_string(),
            vec![Diagnostic::error_on_line(0, "x at - line 1.".to_string())],
        );
        let mut buf = Vec::new();
        write_summary(&mut buf, 2, &store.snapshot()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2 files checked, 3 diagnostics in 2 files (E:3)\n"
        );
    }
}

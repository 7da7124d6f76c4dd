//! Linter facade: the session registry consumed by the editor layer.
//!
//! One checker process per document URI. A new request for a URI replaces
//! the old session in a single locked step: remove the old entry, signal its
//! checker, spawn the new checker, insert it. The old checker has therefore
//! been signalled before the new one exists. Each request gets
//! its own [`LintTicket`], so a superseded session can never resolve a newer
//! caller's ticket.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use perlcheck_types::Diagnostic;

use crate::error::LintError;
use crate::invoker::{CheckInvocation, SpawnedChecker};
use crate::session::{
    CheckerProcess, Session, SessionEntry, SessionLimits, SessionResult, SessionTable,
};
use crate::types::{CheckerConfig, LintOutcome};

/// Session registry and entry point for lint requests.
pub struct Linter {
    invocation: Arc<CheckInvocation>,
    limits: SessionLimits,
    sessions: SessionTable,
    next_id: AtomicU64,
}

impl Linter {
    /// Invocation parameters, including the executable's resolved path, are
    /// fixed for the lifetime of the linter.
    #[must_use]
    pub fn new(config: &CheckerConfig, workspace_root: &Path) -> Self {
        Self {
            invocation: Arc::new(CheckInvocation::new(config, workspace_root)),
            limits: SessionLimits {
                timeout: config.timeout(),
                supersede_grace: config.supersede_grace(),
            },
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start checking `text` as the current contents of `uri`.
    ///
    /// Any checker already running for `uri` is sent its interrupt before
    /// the new one is spawned, and its result is discarded; this call does
    /// not wait for it to exit. Must be called from within a Tokio runtime.
    ///
    /// A checker that cannot be launched is reported here, not through the ticket.
    pub fn lint(&self, uri: &str, text: &str) -> Result<LintTicket, LintError> {
        let payload = self.invocation.stdin_payload(text);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut sessions = self.lock_sessions();
        if let Some(previous) = sessions.remove(uri) {
            tracing::debug!(uri = %uri, "Superseding running checker");
            previous.interrupt();
        }

        let SpawnedChecker {
            child,
            stdin,
            stderr,
        } = self.invocation.spawn().map_err(|e| {
            tracing::warn!(uri = %uri, "Failed to start checker: {e:#}");
            LintError::Spawn(e)
        })?;
        let process = CheckerProcess::new(child);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        sessions.insert(
            uri.to_string(),
            SessionEntry::new(id, process.clone(), cancel_tx),
        );
        drop(sessions);

        let session = Session {
            id,
            uri: uri.to_string(),
            process,
            stdin,
            stderr,
            payload,
            limits: self.limits,
            table: Arc::clone(&self.sessions),
            cancel_rx,
            result_tx,
        };
        tokio::spawn(session.run());

        Ok(LintTicket {
            uri: uri.to_string(),
            rx: result_rx,
        })
    }

    /// Callback flavour of [`lint`](Self::lint).
    ///
    /// `callback` runs exactly once if this request's session completes or
    /// fails, and never if the session is superseded.
    pub fn lint_with<F>(&self, uri: &str, text: &str, callback: F) -> Result<(), LintError>
    where
        F: FnOnce(Result<Vec<Diagnostic>, LintError>) + Send + 'static,
    {
        let ticket = self.lint(uri, text)?;
        tokio::spawn(async move {
            match ticket.await {
                Ok(LintOutcome::Completed(items)) => callback(Ok(items)),
                Ok(LintOutcome::Superseded) => {}
                Err(e) => callback(Err(e)),
            }
        });
        Ok(())
    }

    /// Interrupt and forget the session for `uri` (e.g. the document closed).
    ///
    /// Returns whether a session was running.
    pub fn cancel(&self, uri: &str) -> bool {
        let previous = self.lock_sessions().remove(uri);
        match previous {
            Some(entry) => {
                tracing::debug!(uri = %uri, "Cancelling running checker");
                entry.interrupt();
                true
            }
            None => false,
        }
    }

    /// Number of documents with a checker still running.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Whether a checker is running for `uri`.
    #[must_use]
    pub fn is_running(&self, uri: &str) -> bool {
        self.lock_sessions().contains_key(uri)
    }

    /// Interrupt every running checker. Outstanding tickets resolve as superseded.
    pub fn shutdown(&self) {
        let sessions = std::mem::take(&mut *self.lock_sessions());
        for (uri, entry) in sessions {
            tracing::debug!(uri = %uri, "Stopping checker on shutdown");
            entry.interrupt();
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-resolution result of one lint request.
///
/// Resolves once the checker has exited and its error stream is drained.
#[derive(Debug)]
pub struct LintTicket {
    uri: String,
    rx: oneshot::Receiver<SessionResult>,
}

impl LintTicket {
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Future for LintTicket {
    type Output = Result<LintOutcome, LintError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(LintError::SessionLost)))
    }
}

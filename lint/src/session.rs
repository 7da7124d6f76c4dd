//! Session task: drives one checker process from spawn through exit.
//!
//! The task writes the input payload, reads the error stream into a
//! [`DiagnosticExtractor`], reaps the process, enforces the lifetime bound,
//! and resolves its own result channel exactly once. The registry signals a
//! superseded checker directly through its [`CheckerProcess`].

use std::collections::HashMap;
use std::io;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::LintError;
use crate::extractor::DiagnosticExtractor;
use crate::types::LintOutcome;

/// How long to keep servicing the checker's pipes after it exited.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How often a running checker is polled for exit.
const REAP_INTERVAL: Duration = Duration::from_millis(50);

const READ_BUFFER_SIZE: usize = 4096;

pub(crate) type SessionResult = Result<LintOutcome, LintError>;

/// URI → live session. The only place sessions are registered or released.
pub(crate) type SessionTable = Arc<Mutex<HashMap<String, SessionEntry>>>;

/// A checker process shared by its session task and the registry.
///
/// Signalling and reaping both happen under this lock, so a pid is never
/// signalled after it has been reaped and possibly reused.
#[derive(Clone)]
pub(crate) struct CheckerProcess(Arc<Mutex<Child>>);

impl CheckerProcess {
    pub fn new(child: Child) -> Self {
        Self(Arc::new(Mutex::new(child)))
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.lock().id()
    }

    /// SIGINT on unix, a forced kill elsewhere. No-op once reaped.
    pub fn interrupt(&self) -> io::Result<()> {
        interrupt(&mut self.lock())
    }

    fn force_kill(&self) -> io::Result<()> {
        self.lock().start_kill()
    }

    fn try_reap(&self) -> io::Result<Option<ExitStatus>> {
        self.lock().try_wait()
    }
}

/// Registry-side handle of a running session.
pub(crate) struct SessionEntry {
    id: u64,
    process: CheckerProcess,
    cancel: oneshot::Sender<()>,
}

impl SessionEntry {
    pub fn new(id: u64, process: CheckerProcess, cancel: oneshot::Sender<()>) -> Self {
        Self {
            id,
            process,
            cancel,
        }
    }

    /// Signal the checker now and start the session's grace period. Does not
    /// wait for the process to exit.
    pub fn interrupt(self) {
        if let Err(e) = self.process.interrupt() {
            tracing::debug!(session = self.id, "Failed to interrupt checker: {e}");
        }
        // The receiver is gone once the session has already finished.
        let _ = self.cancel.send(());
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionLimits {
    pub timeout: Option<Duration>,
    pub supersede_grace: Duration,
}

pub(crate) struct Session {
    pub id: u64,
    pub uri: String,
    pub process: CheckerProcess,
    pub stdin: ChildStdin,
    pub stderr: ChildStderr,
    pub payload: Vec<u8>,
    pub limits: SessionLimits,
    pub table: SessionTable,
    pub cancel_rx: oneshot::Receiver<()>,
    pub result_tx: oneshot::Sender<SessionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    /// The checker's overall lifetime bound.
    Lifetime,
    /// A superseded checker ignoring its interrupt.
    Grace,
    /// Stderr still open after exit (e.g. held by a grandchild).
    Drain,
}

impl Session {
    pub async fn run(self) {
        let Self {
            id,
            uri,
            process,
            stdin,
            mut stderr,
            payload,
            limits,
            table,
            mut cancel_rx,
            result_tx,
        } = self;

        tracing::debug!(uri = %uri, session = id, pid = ?process.id(), "Checker started");

        let mut writer_handle = tokio::spawn(write_input(stdin, payload));

        let mut extractor = DiagnosticExtractor::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut stderr_open = true;
        let mut exit_status: Option<io::Result<ExitStatus>> = None;
        let mut cancelled = false;
        let mut deadline = limits
            .timeout
            .map(|timeout| (Instant::now() + timeout, Deadline::Lifetime));
        let mut reap_tick = tokio::time::interval(REAP_INTERVAL);
        reap_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while stderr_open || exit_status.is_none() {
            let sleep_at = deadline.map_or_else(Instant::now, |(at, _)| at);
            tokio::select! {
                read = stderr.read(&mut buf), if stderr_open => match read {
                    Ok(0) => stderr_open = false,
                    Ok(n) => extractor.feed(&buf[..n]),
                    Err(e) => {
                        tracing::debug!(uri = %uri, session = id, "Checker stderr read error: {e}");
                        stderr_open = false;
                    }
                },
                _ = reap_tick.tick(), if exit_status.is_none() => {
                    if let Some(status) = process.try_reap().transpose() {
                        exit_status = Some(status);
                        deadline = Some((Instant::now() + PIPE_DRAIN_TIMEOUT, Deadline::Drain));
                    }
                }
                // The registry already signalled the checker; only the grace period starts here.
                _ = &mut cancel_rx, if !cancelled => {
                    cancelled = true;
                    if exit_status.is_none() {
                        deadline = Some((Instant::now() + limits.supersede_grace, Deadline::Grace));
                    }
                }
                () = tokio::time::sleep_until(sleep_at), if deadline.is_some() => {
                    let kind = deadline.take().map(|(_, kind)| kind);
                    match kind {
                        Some(Deadline::Lifetime) => {
                            tracing::warn!(
                                uri = %uri,
                                session = id,
                                timeout = ?limits.timeout,
                                "Checker exceeded its time limit, killing"
                            );
                            force_kill(&process, &uri, id);
                        }
                        Some(Deadline::Grace) => {
                            tracing::debug!(uri = %uri, session = id, "Superseded checker ignored interrupt, killing");
                            force_kill(&process, &uri, id);
                        }
                        Some(Deadline::Drain) => {
                            tracing::warn!(uri = %uri, session = id, "Checker stderr still open after exit; stopped reading");
                            stderr_open = false;
                        }
                        None => {}
                    }
                }
            }
        }

        match &exit_status {
            Some(Ok(status)) => {
                tracing::debug!(uri = %uri, session = id, status = %status, "Checker exited");
            }
            Some(Err(e)) => {
                tracing::warn!(uri = %uri, session = id, "Failed to wait for checker: {e}");
            }
            None => {}
        }

        let input = match tokio::time::timeout(PIPE_DRAIN_TIMEOUT, &mut writer_handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(io::Error::other(e)),
            Err(_) => {
                // Stdin is held open by something that never reads it.
                writer_handle.abort();
                tracing::debug!(uri = %uri, session = id, "Abandoned checker input after exit");
                Ok(())
            }
        };
        let diagnostics = extractor.finish();

        let outcome = if release(&table, &uri, id) {
            match input {
                Err(e) if diagnostics.is_empty() => Err(LintError::Input(e)),
                Err(e) => {
                    tracing::debug!(uri = %uri, session = id, "Checker closed its input early: {e}");
                    Ok(LintOutcome::Completed(diagnostics))
                }
                Ok(()) => Ok(LintOutcome::Completed(diagnostics)),
            }
        } else {
            tracing::debug!(uri = %uri, session = id, "Discarding superseded checker results");
            Ok(LintOutcome::Superseded)
        };

        // The caller may have stopped waiting.
        let _ = result_tx.send(outcome);
    }
}

async fn write_input(mut stdin: ChildStdin, payload: Vec<u8>) -> io::Result<()> {
    stdin.write_all(&payload).await?;
    stdin.shutdown().await
}

/// Remove this session from the table if it still owns its slot.
///
/// Returns `false` when a newer session (or a cancel) took the slot first.
fn release(table: &SessionTable, uri: &str, id: u64) -> bool {
    let mut sessions = table.lock().unwrap_or_else(PoisonError::into_inner);
    match sessions.get(uri) {
        Some(entry) if entry.id == id => {
            sessions.remove(uri);
            true
        }
        _ => false,
    }
}

fn force_kill(process: &CheckerProcess, uri: &str, id: u64) {
    if let Err(e) = process.force_kill() {
        tracing::debug!(uri = %uri, session = id, "Failed to kill checker: {e}");
    }
}

/// Send SIGINT, the signal an interactive user would use to stop the checker.
#[cfg(unix)]
fn interrupt(child: &mut Child) -> io::Result<()> {
    // `id()` is `None` once the child has been reaped; nothing to signal.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;
    // SAFETY: `pid` is our own unreaped child, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use tokio::process::Command;

    fn spawn_process(program: &str, args: &[&str]) -> CheckerProcess {
        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        CheckerProcess::new(child)
    }

    fn table_with(uri: &str, id: u64) -> (SessionTable, oneshot::Receiver<()>, CheckerProcess) {
        let (tx, rx) = oneshot::channel();
        let process = spawn_process("sleep", &["30"]);
        let table: SessionTable = Arc::new(Mutex::new(HashMap::new()));
        table
            .lock()
            .unwrap()
            .insert(uri.to_string(), SessionEntry::new(id, process.clone(), tx));
        (table, rx, process)
    }

    async fn reap_within(process: &CheckerProcess, limit: Duration) -> ExitStatus {
        tokio::time::timeout(limit, async {
            loop {
                if let Some(status) = process.try_reap().unwrap() {
                    return status;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("process should exit")
    }

    #[tokio::test]
    async fn test_release_own_slot() {
        let (table, _rx, _process) = table_with("file:///a.pl", 7);
        assert!(release(&table, "file:///a.pl", 7));
        assert!(table.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_keeps_newer_session() {
        let (table, _rx, _process) = table_with("file:///a.pl", 8);
        assert!(!release(&table, "file:///a.pl", 7));
        assert_eq!(table.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_release_after_cancel() {
        let table: SessionTable = Arc::new(Mutex::new(HashMap::new()));
        assert!(!release(&table, "file:///a.pl", 1));
    }

    #[tokio::test]
    async fn test_interrupt_signals_process_before_returning() {
        let (table, rx, process) = table_with("file:///a.pl", 1);
        let entry = table.lock().unwrap().remove("file:///a.pl").unwrap();
        entry.interrupt();

        // Blocking wait: the signal must not depend on the runtime polling anything.
        std::thread::sleep(Duration::from_millis(200));
        let status = process.try_reap().unwrap().expect("sleep should have died");
        assert_eq!(status.signal(), Some(libc::SIGINT));
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_interrupt_after_session_finished_is_harmless() {
        let (table, rx, process) = table_with("file:///a.pl", 1);
        drop(rx);
        let entry = table.lock().unwrap().remove("file:///a.pl").unwrap();
        entry.interrupt();
        let status = reap_within(&process, Duration::from_secs(5)).await;
        assert_eq!(status.signal(), Some(libc::SIGINT));
    }

    #[tokio::test]
    async fn test_reaped_process_is_not_signalled() {
        let process = spawn_process("true", &[]);
        let status = reap_within(&process, Duration::from_secs(5)).await;
        assert!(status.success());
        assert_eq!(process.id(), None);
        assert!(process.interrupt().is_ok());
    }
}

use tokio::task::JoinHandle;

/// RAII guard for one session's forwarder task.
///
/// Invariants:
/// - A guard is created *only* for a task spawned by StreamSession
/// - Dropping the guard aborts the task, which takes the connection and
///   the keepalive timer with it; no timer outlives its session
#[derive(Debug)]
pub struct SessionGuard {
    handle: JoinHandle<()>,
}

impl SessionGuard {
    /// Wrap an already-spawned forwarder task.
    /// This is intentionally restricted so sessions cannot share tasks.
    pub(crate) fn new_spawned(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }
}

impl Drop for SessionGuard {
    /// Abort the task when the session goes away.
    fn drop(&mut self) {
        self.handle.abort();
    }
}

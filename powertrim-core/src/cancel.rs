// ============================================================================
// powertrim-core/src/cancel.rs
// ============================================================================
//
// CANCELLATION: Cooperative Job Cancellation
//
// A CancellationToken is shared between the caller and the job worker. The
// worker checks it between steps and attaches every running external process
// to it, so a cancel request terminates that process immediately.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Something that can terminate a running external process.
pub trait ProcessKiller: Send + Sync {
    fn kill(&self) -> io::Result<()>;
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    active: Mutex<Option<Arc<dyn ProcessKiller>>>,
}

/// Cloneable handle used to request and observe cancellation of one job.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<CancelState>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and kills the attached process, if any.
    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("Cancellation requested");
        let killer = match self.state.active.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(killer) = killer {
            if let Err(e) = killer.kill() {
                log::warn!("Failed to terminate running process: {e}");
            }
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Registers the running process until the returned guard is dropped.
    ///
    /// A process attached after cancellation is killed right away.
    pub fn attach(&self, killer: Arc<dyn ProcessKiller>) -> ActiveProcessGuard<'_> {
        match self.state.active.lock() {
            Ok(mut slot) => *slot = Some(Arc::clone(&killer)),
            Err(poisoned) => *poisoned.into_inner() = Some(Arc::clone(&killer)),
        }
        if self.is_cancelled() {
            if let Err(e) = killer.kill() {
                log::warn!("Failed to terminate process started after cancellation: {e}");
            }
        }
        ActiveProcessGuard { token: self }
    }

    fn detach(&self) {
        match self.state.active.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

/// Clears the token's active process on drop.
pub struct ActiveProcessGuard<'a> {
    token: &'a CancellationToken,
}

impl Drop for ActiveProcessGuard<'_> {
    fn drop(&mut self) {
        self.token.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingKiller(AtomicUsize);

    impl ProcessKiller for CountingKiller {
        fn kill(&self) -> io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn cancel_kills_attached_process() {
        let token = CancellationToken::new();
        let killer = Arc::new(CountingKiller::default());
        let _guard = token.attach(killer.clone());
        token.clone().cancel();
        assert!(token.is_cancelled());
        assert_eq!(killer.0.load(Ordering::SeqCst), 1);
        token.cancel();
        assert_eq!(killer.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_process_is_not_killed() {
        let token = CancellationToken::new();
        let killer = Arc::new(CountingKiller::default());
        drop(token.attach(killer.clone()));
        token.cancel();
        assert_eq!(killer.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn attach_after_cancel_kills_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let killer = Arc::new(CountingKiller::default());
        let _guard = token.attach(killer.clone());
        assert_eq!(killer.0.load(Ordering::SeqCst), 1);
    }
}

use std::sync::Weak;
use std::time::Duration;

use tokio::select;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;

use crate::session::SessionInner;
use crate::target::TargetInner;

/// Background reconciliation task for one observed target.
///
/// Property removal bypasses the accessor layer, so a recurring tick checks
/// every registered path against the live tree and auto-unobserves the ones
/// that stopped resolving. Detection is bounded by the period, not exact.
///
/// The poller holds only weak references: it never keeps a target or a
/// session alive, and it stops on its own when either is gone, when its
/// registry entry disappears, or when the cancellation token fires.
pub(crate) struct DeletionPoller {
    pub target: Weak<TargetInner>,
    pub session: Weak<SessionInner>,
    pub period: Duration,
    pub cancel: CancellationToken,
}

impl DeletionPoller {
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        loop {
            select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.tick() {
                        break;
                    }
                }
            }
        }
    }

    /// One reconciliation pass. Returns false when the poller has nothing
    /// left to watch. A registry entry missing mid-race (e.g. a concurrent
    /// unobserve) is a no-op, not a fault.
    fn tick(&self) -> bool {
        let (Some(target), Some(session)) = (self.target.upgrade(), self.session.upgrade())
        else {
            return false;
        };
        let id = target.id;
        let Some(paths) = session.registry_lock().paths_of(&id) else {
            return false;
        };

        let reaped = {
            let mut state = target.state.lock().expect("target state lock poisoned");
            super::reap_missing(&mut state, &paths)
        };

        let mut own_handle = None;
        for (path, pending) in reaped {
            if let Some(handle) = session.registry_lock().unregister(&id, &path) {
                own_handle = Some(handle);
            }
            if let Some(pending) = pending {
                tracing::debug!(target_id = %id, path = %path, "observed property removed, auto-unobserving");
                pending.fire();
            }
        }

        match own_handle {
            // the reaped path was the last one; the handle is this task's
            Some(handle) => {
                handle.cancel.cancel();
                false
            }
            None => true,
        }
    }
}

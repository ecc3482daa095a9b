use std::collections::{HashMap, HashSet};
use std::sync::Weak;

use tokio_util::sync::CancellationToken;

use crate::path::PropPath;
use crate::target::{Target, TargetInner};
use crate::TargetId;

/// Handle to a running deletion poller task.
pub(crate) struct PollerHandle {
    pub cancel: CancellationToken,
    pub task: tokio::task::JoinHandle<()>,
}

/// One observed target: the paths under observation, a weak link back to
/// the live target, and the poller if one is running.
pub(crate) struct TargetEntry {
    pub target: Weak<TargetInner>,
    pub paths: HashSet<PropPath>,
    pub poller: Option<PollerHandle>,
}

/// Per-session observation table: target identity → entry.
///
/// An entry exists exactly while the target has at least one observed
/// property; entries are created on first registration, removed when their
/// last path is unregistered, and disposed independently of one another.
/// The observed-target count is simply the number of live entries.
pub(crate) struct Registry {
    targets: HashMap<TargetId, TargetEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            targets: HashMap::new(),
        }
    }

    pub fn register(&mut self, target: &Target, path: PropPath) {
        self.targets
            .entry(target.id())
            .or_insert_with(|| TargetEntry {
                target: std::sync::Arc::downgrade(&target.inner),
                paths: HashSet::new(),
                poller: None,
            })
            .paths
            .insert(path);
    }

    /// Remove one path. When the entry empties it is dropped and its poller
    /// handle is handed back for cancellation.
    pub fn unregister(&mut self, id: &TargetId, path: &PropPath) -> Option<PollerHandle> {
        let entry = self.targets.get_mut(id)?;
        entry.paths.remove(path);
        if entry.paths.is_empty() {
            self.targets.remove(id).and_then(|entry| entry.poller)
        } else {
            None
        }
    }

    pub fn remove_entry(&mut self, id: &TargetId) -> Option<TargetEntry> {
        self.targets.remove(id)
    }

    pub fn entry_mut(&mut self, id: &TargetId) -> Option<&mut TargetEntry> {
        self.targets.get_mut(id)
    }

    pub fn paths_of(&self, id: &TargetId) -> Option<Vec<PropPath>> {
        self.targets
            .get(id)
            .map(|entry| entry.paths.iter().cloned().collect())
    }

    pub fn has_entry(&self, id: &TargetId) -> bool {
        self.targets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn drain_entries(&mut self) -> Vec<TargetEntry> {
        self.targets.drain().map(|(_, entry)| entry).collect()
    }

    /// Cancel every poller without awaiting; used on session drop.
    pub fn cancel_all(&mut self) {
        for entry in self.targets.values() {
            if let Some(poller) = &entry.poller {
                poller.cancel.cancel();
            }
        }
    }
}

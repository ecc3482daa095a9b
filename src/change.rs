use crate::Value;

/// Notification delivered to a [`ChangeObserver`] when an observed property
/// changes.
///
/// - `path`: arrow-joined chain of property names describing how the changed
///   value was reached (e.g. `"limits -> retries"`).
/// - `old`: deep snapshot of the value before the change, never an alias
///   into the live target.
/// - `new`: the value after the change. For sub-key writes and method calls
///   this is the whole object the monitor watches, not just the member that
///   moved.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Change {
    pub path: String,
    pub old: Value,
    pub new: Value,
    pub origin: ChangeOrigin,
}

/// How a change came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ChangeOrigin {
    /// The observed property was reassigned as a whole.
    Assign,
    /// A sub-key or index of the observed object was written.
    KeyWrite,
    /// A mutating method was invoked on the observed object.
    MethodCall,
    /// The deletion poller found the property gone and auto-unobserved it.
    Removal,
}

/// Callback invoked synchronously for every change to an observed property.
///
/// Observers run after the engine has committed the write and released its
/// locks, so an observer may freely call back into the session (including
/// `observe`/`unobserve` on the same target).
///
/// Any `Fn(&Change) + Send + Sync` closure is an observer:
///
/// ```rust
/// use kanshi::{Change, Session, Target};
///
/// let session = Session::new();
/// let target = Target::from_iter([("count", 0)]);
/// session.observe_with(
///     &target,
///     "count",
///     |change: &Change| println!("{} changed: {:?} -> {:?}", change.path, change.old, change.new),
///     kanshi::ObserveOptions::default().with_poll_deletions(false),
/// )?;
/// target.set("count", 1)?;
/// # Ok::<(), kanshi::Error>(())
/// ```
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, change: &Change);
}

impl<F> ChangeObserver for F
where
    F: Fn(&Change) + Send + Sync,
{
    fn on_change(&self, change: &Change) {
        self(change)
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::change::{Change, ChangeObserver, ChangeOrigin};
use crate::path::PropPath;
use crate::target::{PropSlot, TargetState, lookup, lookup_mut};
use crate::{Error, Result, Value, snapshot};

/// Installed behavior for one observed (target, property path) pair: the
/// observer, the path rendered for callbacks, and the shadow snapshot kept
/// structurally equal to the live value.
pub(crate) struct Monitor {
    pub observer: Arc<dyn ChangeObserver>,
    pub rendered: String,
    pub snapshot: Value,
}

/// A notification captured while the engine held its locks, fired after
/// they are released. Keeping the commit and the callback apart is what
/// makes reentrant `observe`/`unobserve` from inside an observer safe.
pub(crate) struct Pending {
    observer: Arc<dyn ChangeObserver>,
    change: Change,
}

impl Pending {
    fn new(observer: Arc<dyn ChangeObserver>, change: Change) -> Self {
        Pending { observer, change }
    }

    pub fn fire(self) {
        self.observer.on_change(&self.change);
    }
}

/// Install a monitor at `path`, snapshotting the current value.
///
/// Rejects missing properties, double observation, and constant top-level
/// properties (the non-reconfigurable case).
pub(crate) fn install(
    state: &mut TargetState,
    path: PropPath,
    observer: Arc<dyn ChangeObserver>,
) -> Result<()> {
    if state.monitors.contains_key(&path) {
        return Err(Error::AlreadyObserved(path.render()));
    }
    let snapshot = match path.as_root() {
        Some(name) => {
            let slot = state
                .props
                .get(name)
                .ok_or_else(|| Error::PropertyNotFound(name.to_string()))?;
            if slot.constant {
                return Err(Error::ConstantProperty(name.to_string()));
            }
            snapshot::clone_value(&slot.value)
        }
        None => {
            let live = lookup(&state.props, &path)
                .ok_or_else(|| Error::PropertyNotFound(path.render()))?;
            snapshot::clone_value(live)
        }
    };
    let rendered = path.render();
    state.monitors.insert(
        path,
        Monitor {
            observer,
            rendered,
            snapshot,
        },
    );
    Ok(())
}

pub(crate) fn remove_monitor(state: &mut TargetState, path: &PropPath) -> Option<Monitor> {
    state.monitors.remove(path)
}

/// Route a write of `key` on the object at `parent`.
///
/// A monitor at exactly `parent + key` fires as a reassignment of that
/// property; failing that, a monitor at `parent` fires as a trapped sub-key
/// write; otherwise the write is plain. In every case the live write and
/// the snapshot update are committed before the returned [`Pending`] can
/// run the observer.
pub(crate) fn write(
    state: &mut TargetState,
    parent: &PropPath,
    key: &str,
    value: Value,
) -> Result<Option<Pending>> {
    if parent.is_empty() {
        if let Some(slot) = state.props.get(key) {
            if slot.constant {
                return Err(Error::ConstantWrite(key.to_string()));
            }
        }
    }
    let full = parent.child(key);
    if state.monitors.contains_key(&full) {
        commit_assign(state, parent, key, value).map(Some)
    } else if state.monitors.contains_key(parent) {
        commit_trap_write(state, parent, key, value).map(Some)
    } else {
        commit_plain(state, parent, key, value)?;
        Ok(None)
    }
}

fn commit_plain(state: &mut TargetState, parent: &PropPath, key: &str, value: Value) -> Result<()> {
    if parent.is_empty() {
        match state.props.get_mut(key) {
            Some(slot) => slot.value = value,
            None => {
                state.props.insert(
                    key.to_string(),
                    PropSlot {
                        value,
                        constant: false,
                    },
                );
            }
        }
        Ok(())
    } else {
        let live = lookup_mut(&mut state.props, parent)
            .ok_or_else(|| Error::PropertyNotFound(parent.render()))?;
        live.set_key(key, value)
    }
}

fn commit_assign(
    state: &mut TargetState,
    parent: &PropPath,
    key: &str,
    value: Value,
) -> Result<Pending> {
    let full = parent.child(key);
    commit_plain(state, parent, key, value.clone())?;

    let monitor = state
        .monitors
        .get_mut(&full)
        .expect("monitor present in the assign branch");
    let old = std::mem::replace(&mut monitor.snapshot, snapshot::clone_value(&value));
    let pending = Pending::new(
        monitor.observer.clone(),
        Change {
            path: monitor.rendered.clone(),
            old,
            new: value,
            origin: ChangeOrigin::Assign,
        },
    );

    refresh_descendants(&state.props, &mut state.monitors, &full);
    Ok(pending)
}

fn commit_trap_write(
    state: &mut TargetState,
    parent: &PropPath,
    key: &str,
    value: Value,
) -> Result<Pending> {
    {
        let live = lookup_mut(&mut state.props, parent)
            .ok_or_else(|| Error::PropertyNotFound(parent.render()))?;
        live.set_key(key, value.clone())?;
    }
    let new_value = lookup(&state.props, parent)
        .map(snapshot::clone_value)
        .expect("live value present after a committed write");

    let monitor = state
        .monitors
        .get_mut(parent)
        .expect("monitor present in the trap branch");
    let old = monitor.snapshot.clone();
    // replay the write onto the shadow; resync wholesale if the shadow
    // drifted out of shape
    if monitor.snapshot.set_key(key, value).is_err() {
        monitor.snapshot = snapshot::clone_value(&new_value);
    }
    Ok(Pending::new(
        monitor.observer.clone(),
        Change {
            path: monitor.rendered.clone(),
            old,
            new: new_value,
            origin: ChangeOrigin::KeyWrite,
        },
    ))
}

/// Invoke a method on the object at `path`, intercepting when monitored.
pub(crate) fn invoke(
    state: &mut TargetState,
    path: &PropPath,
    method: &str,
    args: &[Value],
) -> Result<(Value, Option<Pending>)> {
    let monitored = state.monitors.contains_key(path);
    let (result, new_value) = {
        let live = lookup_mut(&mut state.props, path)
            .ok_or_else(|| Error::PropertyNotFound(path.render()))?;
        let result = live.apply_method(method, args)?;
        let new_value = monitored.then(|| snapshot::clone_value(live));
        (result, new_value)
    };
    let Some(new_value) = new_value else {
        return Ok((result, None));
    };

    let monitor = state
        .monitors
        .get_mut(path)
        .expect("monitor present when the invoke is intercepted");
    let old = monitor.snapshot.clone();
    if monitor.snapshot.apply_method(method, args).is_err() {
        monitor.snapshot = snapshot::clone_value(&new_value);
    }
    let pending = Pending::new(
        monitor.observer.clone(),
        Change {
            path: monitor.rendered.clone(),
            old,
            new: new_value,
            origin: ChangeOrigin::MethodCall,
        },
    );
    Ok((result, Some(pending)))
}

/// Remove monitors for registered paths that no longer resolve against the
/// live tree, yielding one removal notification each. Paths with no monitor
/// (already torn down elsewhere) are reported for registry cleanup only.
pub(crate) fn reap_missing(
    state: &mut TargetState,
    paths: &[PropPath],
) -> Vec<(PropPath, Option<Pending>)> {
    let mut reaped = Vec::new();
    for path in paths {
        if lookup(&state.props, path).is_some() {
            continue;
        }
        let pending = state.monitors.remove(path).map(|monitor| {
            Pending::new(
                monitor.observer,
                Change {
                    path: monitor.rendered,
                    old: monitor.snapshot,
                    new: Value::Null,
                    origin: ChangeOrigin::Removal,
                },
            )
        });
        reaped.push((path.clone(), pending));
    }
    reaped
}

/// After a reassignment at `base`, re-sync the snapshots of monitors
/// installed below it against the new tree. Paths that stopped resolving
/// are left for the deletion poller.
fn refresh_descendants(
    props: &BTreeMap<String, PropSlot>,
    monitors: &mut HashMap<PropPath, Monitor>,
    base: &PropPath,
) {
    for (path, monitor) in monitors.iter_mut() {
        if path != base && path.starts_with(base) {
            if let Some(live) = lookup(props, path) {
                monitor.snapshot = snapshot::clone_value(live);
            }
        }
    }
}

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::change::ChangeObserver;
use crate::internal::{DeletionPoller, PollerHandle, Registry};
use crate::path::PropPath;
use crate::target::{Target, TargetState, lookup};
use crate::{Error, ObserveOptions, Result, internal};

/// A single property name or an ordered list of them, accepted by
/// [`Session::observe`] and friends.
pub struct PropList(Vec<String>);

impl From<&str> for PropList {
    fn from(prop: &str) -> Self {
        PropList(vec![prop.to_string()])
    }
}

impl From<String> for PropList {
    fn from(prop: String) -> Self {
        PropList(vec![prop])
    }
}

impl From<Vec<String>> for PropList {
    fn from(props: Vec<String>) -> Self {
        PropList(props)
    }
}

impl From<Vec<&str>> for PropList {
    fn from(props: Vec<&str>) -> Self {
        PropList(props.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PropList {
    fn from(props: &[&str]) -> Self {
        PropList(props.iter().map(|p| p.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PropList {
    fn from(props: [&str; N]) -> Self {
        PropList(props.iter().map(|p| p.to_string()).collect())
    }
}

/// Observation context: owns the registry of observed targets and their
/// deletion pollers.
///
/// - `observe(target, props, callback)` starts observing with defaults.
/// - `observe_with(..)` takes explicit [`ObserveOptions`].
/// - `unobserve(target, props)` stops observing listed properties; values
///   stay exactly as they were.
/// - `unobserve_all(target)` tears down everything tracked for a target,
///   including depth-expanded nested monitors.
/// - `shutdown()` cancels all pollers and awaits their tasks; dropping the
///   session cancels them without awaiting.
///
/// Sessions are independent: observations made through one never show up in
/// another's registry or count. Handles are cheap to clone and clones share
/// the same session.
///
/// See also: [`Target`], [`crate::ChangeObserver`], [`ObserveOptions`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    registry: Mutex<Registry>,
}

impl SessionInner {
    pub(crate) fn registry_lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().expect("session registry lock poisoned")
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Ok(registry) = self.registry.get_mut() {
            registry.cancel_all();
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            inner: Arc::new(SessionInner {
                registry: Mutex::new(Registry::new()),
            }),
        }
    }

    /// Observe one or more properties of `target` with default options.
    ///
    /// Every listed property must exist and must not already be observed;
    /// otherwise an error is returned and nothing is installed. The observer
    /// fires synchronously on reassignment, sub-key writes, and intercepted
    /// method calls, and asynchronously (within one polling period) when a
    /// property is removed.
    pub fn observe<O>(
        &self,
        target: &Target,
        props: impl Into<PropList>,
        observer: O,
    ) -> Result<()>
    where
        O: ChangeObserver + 'static,
    {
        self.observe_with(target, props, observer, ObserveOptions::default())
    }

    /// Observe with explicit options. See [`ObserveOptions`].
    pub fn observe_with<O>(
        &self,
        target: &Target,
        props: impl Into<PropList>,
        observer: O,
        options: ObserveOptions,
    ) -> Result<()>
    where
        O: ChangeObserver + 'static,
    {
        options.validate()?;
        if options.poll_deletions && tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::RuntimeUnavailable);
        }
        let props = props.into().0;
        let observer: Arc<dyn ChangeObserver> = Arc::new(observer);
        let mut installed: Vec<PropPath> = Vec::new();
        {
            let mut state = target.lock_state();
            // check the whole list before installing anything
            let mut seen = std::collections::HashSet::new();
            for prop in &props {
                if !seen.insert(prop.as_str()) {
                    return Err(Error::AlreadyObserved(prop.clone()));
                }
                if !state.props.contains_key(prop.as_str()) {
                    return Err(Error::PropertyNotFound(prop.clone()));
                }
                if state.monitors.contains_key(&PropPath::root(prop.as_str())) {
                    return Err(Error::AlreadyObserved(prop.clone()));
                }
            }
            for prop in &props {
                let path = PropPath::root(prop.as_str());
                internal::install(&mut state, path.clone(), observer.clone())?;
                installed.push(path.clone());
                if options.depth > 1 {
                    expand(&mut state, &path, options.depth, &observer, &mut installed)?;
                }
            }
        }
        {
            let mut registry = self.inner.registry_lock();
            for path in installed {
                registry.register(target, path);
            }
            if options.poll_deletions {
                self.start_poller(&mut registry, target, options.poll_interval_ms);
            }
        }
        tracing::debug!(target_id = %target.id(), "observation installed");
        Ok(())
    }

    /// Stop observing the listed properties of `target`.
    ///
    /// The live values are already plain, so each property is left exactly
    /// as it was immediately before the call; subsequent writes never fire.
    /// Unknown targets and unobserved properties are a silent no-op.
    pub fn unobserve(&self, target: &Target, props: impl Into<PropList>) -> Result<()> {
        let props = props.into().0;
        {
            let mut state = target.lock_state();
            for prop in &props {
                internal::remove_monitor(&mut state, &PropPath::root(prop.as_str()));
            }
        }
        let mut handles = Vec::new();
        {
            let mut registry = self.inner.registry_lock();
            for prop in &props {
                if let Some(handle) =
                    registry.unregister(&target.id(), &PropPath::root(prop.as_str()))
                {
                    handles.push(handle);
                }
            }
        }
        for handle in handles {
            handle.cancel.cancel();
        }
        Ok(())
    }

    /// Stop observing every tracked property of `target`, including monitors
    /// installed by depth expansion, and stop its poller.
    pub fn unobserve_all(&self, target: &Target) -> Result<()> {
        let entry = self.inner.registry_lock().remove_entry(&target.id());
        let Some(entry) = entry else {
            return Ok(());
        };
        {
            let mut state = target.lock_state();
            for path in &entry.paths {
                internal::remove_monitor(&mut state, path);
            }
        }
        if let Some(poller) = entry.poller {
            poller.cancel.cancel();
        }
        Ok(())
    }

    /// Number of targets with at least one observed property. Counted per
    /// target, not per property.
    pub fn observed_targets(&self) -> usize {
        self.inner.registry_lock().len()
    }

    /// Whether `target` has at least one observed property in this session.
    pub fn is_observing(&self, target: &Target) -> bool {
        self.inner.registry_lock().has_entry(&target.id())
    }

    /// Tear down all observations, cancel every poller and await their
    /// tasks.
    pub async fn shutdown(&self) {
        let entries = self.inner.registry_lock().drain_entries();
        for entry in entries {
            if let Some(target) = entry.target.upgrade() {
                let mut state = target.state.lock().expect("target state lock poisoned");
                for path in &entry.paths {
                    state.monitors.remove(path);
                }
            }
            if let Some(poller) = entry.poller {
                poller.cancel.cancel();
                let _ = poller.task.await;
            }
        }
    }

    fn start_poller(&self, registry: &mut Registry, target: &Target, period_ms: u64) {
        let Some(entry) = registry.entry_mut(&target.id()) else {
            return;
        };
        if entry.poller.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let poller = DeletionPoller {
            target: Arc::downgrade(&target.inner),
            session: Arc::downgrade(&self.inner),
            period: Duration::from_millis(period_ms),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(poller.run());
        entry.poller = Some(PollerHandle { cancel, task });
        tracing::debug!(target_id = %target.id(), period_ms, "deletion poller started");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive depth expansion: for every object-typed child of the value at
/// `base`, install a monitor on each of the child's members, extending the
/// path by `"<child> -> <member>"` and decrementing the remaining depth.
fn expand(
    state: &mut TargetState,
    base: &PropPath,
    depth: u32,
    observer: &Arc<dyn ChangeObserver>,
    installed: &mut Vec<PropPath>,
) -> Result<()> {
    if depth <= 1 {
        return Ok(());
    }
    let children: Vec<(String, Vec<String>)> = {
        let Some(value) = lookup(&state.props, base) else {
            return Ok(());
        };
        value
            .entries()
            .into_iter()
            .filter(|(_, child)| child.is_object())
            .map(|(key, child)| {
                let members = child.entries().into_iter().map(|(k, _)| k).collect();
                (key, members)
            })
            .collect()
    };
    for (child, members) in children {
        for member in members {
            let path = base.child(&child).child(&member);
            internal::install(state, path.clone(), observer.clone())?;
            installed.push(path.clone());
            expand(state, &path, depth - 1, observer, installed)?;
        }
    }
    Ok(())
}

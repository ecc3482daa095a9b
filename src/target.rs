use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::handle::{ObjectHandle, TrackedValue};
use crate::internal::Monitor;
use crate::path::PropPath;
use crate::{Error, Result, Value, internal, snapshot};

/// Unique identity of a [`Target`], stable across clones of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(Uuid);

impl TargetId {
    pub(crate) fn new() -> Self {
        TargetId(Uuid::new_v4())
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Shared handle to a mutable record of named properties.
///
/// A target is the structure whose properties get observed. Handles are
/// cheap to clone; clones alias the same live state, so a write through one
/// handle is visible through all of them. Code holding a handle reads and
/// writes properties the same way whether or not a
/// [`Session`](crate::Session) is observing them; interception is invisible
/// to the writer.
///
/// [`Target::remove`] is deliberately *not* intercepted: property removal
/// bypasses the accessor layer and is reconciled asynchronously by the
/// deletion poller.
///
/// # Examples
///
/// ```rust
/// use kanshi::{Target, TrackedValue, Value};
///
/// let target = Target::from_iter([
///     ("name", Value::from("worker-1")),
///     ("limits", Value::record([("retries", 3)])),
/// ]);
///
/// target.set("name", "worker-2")?;
/// let TrackedValue::Object(limits) = target.get("limits")? else {
///     unreachable!()
/// };
/// limits.set("retries", 5)?;
/// # Ok::<(), kanshi::Error>(())
/// ```
#[derive(Clone)]
pub struct Target {
    pub(crate) inner: Arc<TargetInner>,
}

pub(crate) struct TargetInner {
    pub(crate) id: TargetId,
    pub(crate) state: Mutex<TargetState>,
}

pub(crate) struct TargetState {
    pub(crate) props: BTreeMap<String, PropSlot>,
    pub(crate) monitors: HashMap<PropPath, Monitor>,
}

pub(crate) struct PropSlot {
    pub value: Value,
    pub constant: bool,
}

impl PropSlot {
    fn plain(value: Value) -> Self {
        PropSlot {
            value,
            constant: false,
        }
    }
}

/// Resolve a path against the live property tree.
pub(crate) fn lookup<'a>(
    props: &'a BTreeMap<String, PropSlot>,
    path: &PropPath,
) -> Option<&'a Value> {
    let mut segments = path.segments().iter();
    let head = segments.next()?;
    let mut current = &props.get(head.as_str())?.value;
    for segment in segments {
        current = current.get_key(segment)?;
    }
    Some(current)
}

pub(crate) fn lookup_mut<'a>(
    props: &'a mut BTreeMap<String, PropSlot>,
    path: &PropPath,
) -> Option<&'a mut Value> {
    let mut segments = path.segments().iter();
    let head = segments.next()?;
    let mut current = &mut props.get_mut(head.as_str())?.value;
    for segment in segments {
        current = current.get_key_mut(segment)?;
    }
    Some(current)
}

impl Target {
    pub fn new() -> Self {
        Target {
            inner: Arc::new(TargetInner {
                id: TargetId::new(),
                state: Mutex::new(TargetState {
                    props: BTreeMap::new(),
                    monitors: HashMap::new(),
                }),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Read a property.
    ///
    /// Leaf values come back as a detached [`TrackedValue::Primitive`] copy;
    /// object-typed values come back as a [`TrackedValue::Object`] handle
    /// that resolves the live value on every call.
    pub fn get(&self, prop: &str) -> Result<TrackedValue> {
        let state = self.lock_state();
        let slot = state
            .props
            .get(prop)
            .ok_or_else(|| Error::PropertyNotFound(prop.to_string()))?;
        if slot.value.is_object() {
            Ok(TrackedValue::Object(ObjectHandle::new(
                self.clone(),
                PropPath::root(prop),
            )))
        } else {
            Ok(TrackedValue::Primitive(snapshot::clone_value(&slot.value)))
        }
    }

    /// Assign a property, creating it if missing.
    ///
    /// If the property is observed, the monitor commits its snapshot update
    /// first and the observer then fires synchronously, outside every engine
    /// lock.
    pub fn set(&self, prop: &str, value: impl Into<Value>) -> Result<()> {
        let pending = {
            let mut state = self.lock_state();
            internal::write(&mut state, &PropPath::empty(), prop, value.into())?
        };
        if let Some(pending) = pending {
            pending.fire();
        }
        Ok(())
    }

    /// Define a constant property. Constants cannot be reassigned, removed,
    /// or observed.
    pub fn set_const(&self, prop: &str, value: impl Into<Value>) -> Result<()> {
        let mut state = self.lock_state();
        if state.monitors.contains_key(&PropPath::root(prop)) {
            return Err(Error::AlreadyObserved(prop.to_string()));
        }
        if let Some(slot) = state.props.get(prop) {
            if slot.constant {
                return Err(Error::ConstantWrite(prop.to_string()));
            }
        }
        state.props.insert(
            prop.to_string(),
            PropSlot {
                value: value.into(),
                constant: true,
            },
        );
        Ok(())
    }

    /// Remove a property, returning its last value.
    ///
    /// Removal bypasses observation: no notification fires here. An observed
    /// property that disappears is detected by the deletion poller within
    /// one polling period and auto-unobserved.
    pub fn remove(&self, prop: &str) -> Result<Option<Value>> {
        let mut state = self.lock_state();
        if let Some(slot) = state.props.get(prop) {
            if slot.constant {
                return Err(Error::ConstantWrite(prop.to_string()));
            }
        }
        Ok(state.props.remove(prop).map(|slot| slot.value))
    }

    pub fn contains(&self, prop: &str) -> bool {
        self.lock_state().props.contains_key(prop)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock_state().props.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_state().props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn lock_state(&self) -> std::sync::MutexGuard<'_, TargetState> {
        self.inner
            .state
            .lock()
            .expect("target state lock poisoned")
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Target
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let target = Target::new();
        {
            let mut state = target.lock_state();
            for (key, value) in iter {
                state
                    .props
                    .insert(key.into(), PropSlot::plain(value.into()));
            }
        }
        target
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Target {}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

use crate::path::PropPath;
use crate::target::lookup;
use crate::{Error, Result, Target, Value, ValueKind, internal, snapshot};

/// A property value as seen through the observation layer.
///
/// Leaf kinds come back as a detached [`Primitive`](TrackedValue::Primitive)
/// copy. Object kinds come back as an [`Object`](TrackedValue::Object)
/// handle through which sub-key writes and mutating method calls are routed,
/// and intercepted when a monitor is installed. The variant a caller gets
/// does not depend on whether observation is active.
#[derive(Debug, Clone)]
pub enum TrackedValue {
    Primitive(Value),
    Object(ObjectHandle),
}

impl TrackedValue {
    /// Materialize the current value as a plain, detached [`Value`].
    pub fn value(&self) -> Result<Value> {
        match self {
            TrackedValue::Primitive(value) => Ok(value.clone()),
            TrackedValue::Object(handle) => handle.to_value(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectHandle> {
        match self {
            TrackedValue::Object(handle) => Some(handle),
            TrackedValue::Primitive(_) => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectHandle> {
        match self {
            TrackedValue::Object(handle) => Some(handle),
            TrackedValue::Primitive(_) => None,
        }
    }
}

/// Capability handle over an object-typed property value.
///
/// The handle stores only the target and the property path; every operation
/// resolves the live value at call time. Reassigning the underlying property
/// therefore never leaves a handle pointing at a stale object: after a
/// reassignment the same handle reads and mutates the new value, and
/// interception keeps working without any re-install step.
///
/// Mutations notify the nearest monitor:
/// - [`set`](ObjectHandle::set) on a key whose exact path is monitored fires
///   as a reassignment of that nested property;
/// - otherwise, if the handle's own path is monitored, it fires as a sub-key
///   write with the whole object as old/new;
/// - otherwise the write is plain.
///
/// Reads ([`get`](ObjectHandle::get), [`to_value`](ObjectHandle::to_value),
/// [`len`](ObjectHandle::len), ...) never notify.
#[derive(Clone)]
pub struct ObjectHandle {
    target: Target,
    path: PropPath,
}

impl ObjectHandle {
    pub(crate) fn new(target: Target, path: PropPath) -> Self {
        ObjectHandle { target, path }
    }

    /// The arrow-joined path this handle addresses.
    pub fn path(&self) -> String {
        self.path.render()
    }

    /// Read a member. Object-typed members come back as a descended handle.
    pub fn get(&self, key: &str) -> Result<TrackedValue> {
        let state = self.target.lock_state();
        let value = lookup(&state.props, &self.path)
            .ok_or_else(|| Error::PropertyNotFound(self.path.render()))?;
        if !value.is_object() {
            return Err(Error::NotObject(value.kind()));
        }
        if matches!(value.kind(), ValueKind::Set) {
            return Err(Error::NotKeyed(ValueKind::Set));
        }
        match value.get_key(key) {
            Some(member) if member.is_object() => Ok(TrackedValue::Object(ObjectHandle::new(
                self.target.clone(),
                self.path.child(key),
            ))),
            Some(member) => Ok(TrackedValue::Primitive(snapshot::clone_value(member))),
            None => Err(Error::PropertyNotFound(self.path.child(key).render())),
        }
    }

    /// Write a member (sub-key or index), creating record/map keys as
    /// needed. Fires the nearest monitor, if any, after the write and the
    /// snapshot update are committed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let pending = {
            let mut state = self.target.lock_state();
            internal::write(&mut state, &self.path, key, value.into())?
        };
        if let Some(pending) = pending {
            pending.fire();
        }
        Ok(())
    }

    /// Invoke a mutating method on the live object and return its natural
    /// result (popped element, displaced entry, insertion flag, new length).
    ///
    /// Supported methods by kind: sequences: `push`, `pop`, `shift`,
    /// `unshift`, `insert`, `remove`, `clear`, `reverse`; maps and records:
    /// `insert`, `remove`, `clear`; sets: `insert`, `remove`, `clear`.
    /// Unknown methods and argument mismatches error without mutating or
    /// notifying. When the handle's path is monitored the same call is
    /// replayed onto the shadow snapshot so it stays structurally equal to
    /// the live object.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let (result, pending) = {
            let mut state = self.target.lock_state();
            internal::invoke(&mut state, &self.path, method, args)?
        };
        if let Some(pending) = pending {
            pending.fire();
        }
        Ok(result)
    }

    /// Detached deep copy of the live value.
    pub fn to_value(&self) -> Result<Value> {
        let state = self.target.lock_state();
        lookup(&state.props, &self.path)
            .map(snapshot::clone_value)
            .ok_or_else(|| Error::PropertyNotFound(self.path.render()))
    }

    pub fn kind(&self) -> Result<ValueKind> {
        let state = self.target.lock_state();
        lookup(&state.props, &self.path)
            .map(Value::kind)
            .ok_or_else(|| Error::PropertyNotFound(self.path.render()))
    }

    /// Member count of the live collection.
    pub fn len(&self) -> Result<usize> {
        let state = self.target.lock_state();
        let value = lookup(&state.props, &self.path)
            .ok_or_else(|| Error::PropertyNotFound(self.path.render()))?;
        value.len().ok_or(Error::NotObject(value.kind()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        let state = self.target.lock_state();
        let value = lookup(&state.props, &self.path)
            .ok_or_else(|| Error::PropertyNotFound(self.path.render()))?;
        match value.kind() {
            ValueKind::Set => Err(Error::NotKeyed(ValueKind::Set)),
            kind if kind.is_object() => Ok(value.get_key(key).is_some()),
            kind => Err(Error::NotObject(kind)),
        }
    }
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("target", &self.target.id())
            .field("path", &self.path)
            .finish()
    }
}

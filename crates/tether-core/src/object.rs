#![forbid(unsafe_code)]

//! Property access capability and the reference observable object.
//!
//! Anything that takes part in a binding implements [`PropertyAccess`]. The
//! trait carries plain `get`/`set`, path helpers built on top of them, and an
//! opt-in key observation hook. Objects that report
//! [`is_observable`](PropertyAccess::is_observable) `== false` are treated as
//! opaque terminals: they can be read and written through a path but never
//! observed.
//!
//! [`Record`] is the stock observable implementation: a key/value map with
//! per-key observers.
//!
//! # Invariants
//!
//! 1. `Record::set` notifies observers of that key only when the new value is
//!    not [identical](crate::Value::identical) to the old one.
//! 2. Observers for a key are notified in registration order.
//! 3. Callbacks run after the record's internal borrow is released, so a
//!    callback may read or write the same record.
//! 4. An observer removed during a notification round may still receive
//!    that round; it never receives a later one.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::value::Value;

/// Shared handle to any property-bearing object.
pub type ObjectRef = Rc<dyn PropertyAccess>;

/// Callback invoked with the key whose value changed.
pub type KeyCallback = Rc<dyn Fn(&str)>;

/// Key under which collection-content changes are announced.
pub const CONTENTS_KEY: &str = "[]";

/// Identifies one key observer on one object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyObserverId(u64);

/// The capability every bindable object provides.
pub trait PropertyAccess {
    /// Read a single key. Unset keys read as [`Value::Null`].
    fn get(&self, key: &str) -> Value;

    /// Write a single key.
    fn set(&self, key: &str, value: Value);

    /// Whether this object supports key observation.
    fn is_observable(&self) -> bool {
        false
    }

    /// Register a key observer. Returns `None` if the object is not
    /// observable.
    fn observe_key(&self, _key: &str, _callback: KeyCallback) -> Option<KeyObserverId> {
        None
    }

    /// Remove a key observer. Unknown ids are ignored.
    fn unobserve_key(&self, _key: &str, _id: KeyObserverId) {}

    /// Read a dotted path relative to this object. Any non-object
    /// intermediate yields `Null`.
    fn get_path(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Value::Null;
        };
        let mut current = self.get(first);
        for segment in segments {
            current = match current {
                Value::Object(obj) => obj.get(segment),
                _ => return Value::Null,
            };
        }
        current
    }

    /// Write a dotted path relative to this object, but only if the current
    /// value is not identical to `value`. Writes through a missing
    /// intermediate are dropped.
    fn set_path_if_changed(&self, path: &str, value: Value) {
        match path.rsplit_once('.') {
            None => {
                if !self.get(path).identical(&value) {
                    self.set(path, value);
                }
            }
            Some((head, key)) => {
                if let Value::Object(target) = self.get_path(head) {
                    target.set_path_if_changed(key, value);
                }
            }
        }
    }
}

struct KeyObserver {
    id: KeyObserverId,
    key: String,
    callback: KeyCallback,
}

#[derive(Default)]
struct RecordInner {
    values: AHashMap<String, Value>,
    observers: Vec<KeyObserver>,
    next_observer: u64,
}

/// Observable key/value object.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tether_core::{PropertyAccess, Record, Value};
///
/// let record = Record::shared();
/// let hits = Rc::new(Cell::new(0));
/// let h = Rc::clone(&hits);
/// record.observe_key("title", Rc::new(move |_: &str| h.set(h.get() + 1)));
///
/// record.set("title", Value::from("a"));
/// record.set("title", Value::from("a"));
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Default)]
pub struct Record {
    inner: RefCell<RecordInner>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record behind an `Rc`.
    #[must_use]
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Create a shared record pre-populated with `pairs`. No observers exist
    /// yet, so nothing is notified.
    #[must_use]
    pub fn with_values<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Rc<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let record = Self::new();
        {
            let mut inner = record.inner.borrow_mut();
            for (key, value) in pairs {
                inner.values.insert(key.into(), value.into());
            }
        }
        Rc::new(record)
    }

    /// Move this record into a type-erased [`ObjectRef`].
    #[must_use]
    pub fn into_ref(self) -> ObjectRef {
        Rc::new(self)
    }

    /// Notify observers of `key` unconditionally. Use with [`CONTENTS_KEY`]
    /// to announce that a collection's contents changed in place.
    pub fn notify_property_change(&self, key: &str) {
        self.notify(key);
    }

    /// Number of observers currently registered for `key`.
    #[must_use]
    pub fn observer_count(&self, key: &str) -> usize {
        self.inner
            .borrow()
            .observers
            .iter()
            .filter(|o| o.key == key)
            .count()
    }

    /// Total number of key observers on this record.
    #[must_use]
    pub fn total_observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Whether `key` has ever been assigned.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().values.contains_key(key)
    }

    fn notify(&self, key: &str) {
        // Collect first so callbacks run outside the borrow.
        let callbacks: Vec<KeyCallback> = self
            .inner
            .borrow()
            .observers
            .iter()
            .filter(|o| o.key == key)
            .map(|o| Rc::clone(&o.callback))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::trace!(key, observers = callbacks.len(), "record key changed");

        for callback in &callbacks {
            callback(key);
        }
    }
}

impl PropertyAccess for Record {
    fn get(&self, key: &str) -> Value {
        self.inner
            .borrow()
            .values
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            let unchanged = inner
                .values
                .get(key)
                .map_or(value.is_none(), |old| old.identical(&value));
            if unchanged {
                return;
            }
            inner.values.insert(key.to_owned(), value);
        }
        self.notify(key);
    }

    fn is_observable(&self) -> bool {
        true
    }

    fn observe_key(&self, key: &str, callback: KeyCallback) -> Option<KeyObserverId> {
        let mut inner = self.inner.borrow_mut();
        inner.next_observer += 1;
        let id = KeyObserverId(inner.next_observer);
        inner.observers.push(KeyObserver {
            id,
            key: key.to_owned(),
            callback,
        });
        Some(id)
    }

    fn unobserve_key(&self, _key: &str, id: KeyObserverId) {
        self.inner.borrow_mut().observers.retain(|o| o.id != id);
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut keys: Vec<&str> = inner.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Record")
            .field("keys", &keys)
            .field("observer_count", &inner.observers.len())
            .finish()
    }
}

thread_local! {
    static GLOBAL_ROOT: Rc<Record> = Record::shared();
}

/// The thread-local namespace object that absolute paths resolve against.
#[must_use]
pub fn global_root() -> Rc<Record> {
    GLOBAL_ROOT.with(Rc::clone)
}

/// [`global_root`] as a type-erased handle.
#[must_use]
pub fn global_root_ref() -> ObjectRef {
    global_root()
}

#![forbid(unsafe_code)]

//! Property bindings between two endpoints.
//!
//! A [`Binding`] keeps the property at its *to* endpoint in step with the
//! property at its *from* endpoint (and, unless one-way, the reverse).
//! Bindings are described with a [`BindingTemplate`] and made live with
//! [`BindingTemplate::instantiate`] or [`BindingTemplate::connect`].
//!
//! # Usage
//!
//! ```
//! use tether_core::{PropertyAccess, Record, Value, global_root};
//! use tether_runtime::reactive::{Scheduler, bind};
//!
//! let controller = Record::with_values([("title", "hello")]);
//! global_root().set("docController", Value::Object(controller.clone()));
//! let label = Record::shared();
//!
//! let scheduler = Scheduler::global();
//! let binding = scheduler.run(|| {
//!     bind("docController.title").to_root(label.clone(), "value").connect()
//! });
//! assert!(label.get("value").identical(&Value::from("hello")));
//!
//! scheduler.run(|| controller.set("title", Value::from("bye")));
//! assert!(label.get("value").identical(&Value::from("bye")));
//! binding.destroy();
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Unbound ──connect──▶ ConnectPending ──flush──▶ Connected
//!    ▲                      │                      │
//!    └──── Disconnected ◀───┴──────disconnect──────┘
//! any ──destroy──▶ Destroyed (terminal)
//! ```
//!
//! Connecting is deferred to the next flush so a whole object graph can be
//! wired up before any value moves. A connected binding is kept alive by its
//! observer registrations until it is disconnected or destroyed.
//!
//! # Invariants
//!
//! 1. A binding is in exactly one [`BindingState`].
//! 2. `connect` on a pending or connected binding is a no-op.
//! 3. `sync` on a pending binding is deferred to the connection, never
//!    dropped.
//! 4. Values only move during a flush; writes use set-if-changed, so an
//!    identical value never re-notifies.
//! 5. Transforms run left to right; `no_error` maps a final error to `Null`.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Endpoint does not resolve | nothing is pushed to that side |
//! | From target not observable | developer warning, `sync` stops |
//! | Notification after disconnect | developer warning, ignored |
//! | `connect` after `destroy` | developer warning, stays destroyed |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tether_core::{CONTENTS_KEY, Endpoint, ObjectRef, PropertyPath, Value, same_object};

use super::mix::{MixAdapter, MixRecipe};
use super::registry::{ObserverCallback, ObserverRegistry, RegistrationId};
use super::scheduler::Scheduler;
use crate::settings;

/// A value transform. Receives the value and the binding applying it.
pub type TransformFn = Rc<dyn Fn(Value, &Binding) -> Value>;

thread_local! {
    static NEXT_BINDING_ID: Cell<u64> = const { Cell::new(1) };
}

/// Binding identity, unique per thread. Used for queue membership and log
/// output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        NEXT_BINDING_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            Self(id)
        })
    }

    /// Raw id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding#{}", self.0)
    }
}

/// Lifecycle state of a live binding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BindingState {
    /// Instantiated, never connected.
    #[default]
    Unbound,
    /// `connect` called; waiting for the next flush.
    ConnectPending,
    /// Observing its endpoints.
    Connected,
    /// Disconnected; may connect again.
    Disconnected,
    /// Destroyed; terminal.
    Destroyed,
}

fn unset_endpoint() -> Endpoint {
    Endpoint::new(PropertyPath::Absolute(Vec::new()))
}

// ---------------------------------------------------------------------------
// BindingTemplate
// ---------------------------------------------------------------------------

/// Binding description.
///
/// Every configuration method consumes the template and returns the
/// configured one, so a shared template is specialized by cloning it first
/// ([`beget`](Self::beget)). A template can be instantiated any number of
/// times; each instance is independent.
#[derive(Clone, Default)]
pub struct BindingTemplate {
    from: Option<Endpoint>,
    to: Option<Endpoint>,
    one_way: bool,
    no_error: bool,
    transforms: Vec<TransformFn>,
    mix: Option<MixRecipe>,
}

impl BindingTemplate {
    /// Empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the from path, keeping no explicit root.
    #[must_use]
    pub fn from(mut self, path: impl Into<PropertyPath>) -> Self {
        self.from = Some(Endpoint::new(path));
        self
    }

    /// Set the from path relative to `root`.
    #[must_use]
    pub fn from_root(mut self, root: ObjectRef, path: impl Into<PropertyPath>) -> Self {
        self.from = Some(Endpoint::rooted(root, path));
        self
    }

    /// Set the from endpoint.
    #[must_use]
    pub fn from_endpoint(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.from = Some(endpoint.into());
        self
    }

    /// Set the to path, keeping no explicit root.
    #[must_use]
    pub fn to(mut self, path: impl Into<PropertyPath>) -> Self {
        self.to = Some(Endpoint::new(path));
        self
    }

    /// Set the to path relative to `root`.
    #[must_use]
    pub fn to_root(mut self, root: ObjectRef, path: impl Into<PropertyPath>) -> Self {
        self.to = Some(Endpoint::rooted(root, path));
        self
    }

    /// Set the to endpoint.
    #[must_use]
    pub fn to_endpoint(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.to = Some(endpoint.into());
        self
    }

    /// Relay only from → to when `flag` is set.
    #[must_use]
    pub fn one_way(mut self, flag: bool) -> Self {
        self.one_way = flag;
        self
    }

    /// Map a final error value to `Null` when `flag` is set.
    #[must_use]
    pub fn no_error(mut self, flag: bool) -> Self {
        self.no_error = flag;
        self
    }

    /// Append a transform.
    #[must_use]
    pub fn transform(mut self, f: impl Fn(Value, &Binding) -> Value + 'static) -> Self {
        self.transforms.push(Rc::new(f));
        self
    }

    /// Drop all transforms.
    #[must_use]
    pub fn reset_transforms(mut self) -> Self {
        self.transforms.clear();
        self
    }

    /// Copy this template for specialization.
    #[must_use]
    pub fn beget(&self) -> Self {
        self.clone()
    }

    pub(crate) fn with_mix(mut self, recipe: MixRecipe) -> Self {
        self.mix = Some(recipe);
        self.one_way = true;
        self
    }

    /// Whether instances relay only from → to.
    #[must_use]
    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    /// Number of transforms in the chain.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// The from endpoint, if set.
    #[must_use]
    pub fn from_endpoint_ref(&self) -> Option<&Endpoint> {
        self.from.as_ref()
    }

    /// The to endpoint, if set.
    #[must_use]
    pub fn to_endpoint_ref(&self) -> Option<&Endpoint> {
        self.to.as_ref()
    }

    /// Create a live, unconnected binding. A mix template gets a fresh
    /// adapter per instance.
    #[must_use]
    pub fn instantiate(&self) -> Binding {
        let mix = self.mix.as_ref().map(MixAdapter::create);
        let from = match &mix {
            Some(adapter) => adapter.aggregate_endpoint(),
            None => self.from.clone().unwrap_or_else(unset_endpoint),
        };
        let scheduler = Scheduler::global();
        let registry = scheduler.registry().clone();
        Binding {
            id: BindingId::next(),
            inner: Rc::new(RefCell::new(BindingInner {
                from,
                to: self.to.clone().unwrap_or_else(unset_endpoint),
                one_way: self.one_way || mix.is_some(),
                no_error: self.no_error,
                transforms: Rc::from(self.transforms.clone()),
                mix,
                state: BindingState::Unbound,
                sync_on_connect: false,
                from_resolved: None,
                to_resolved: None,
                from_observer: None,
                to_observer: None,
                binding_value: None,
                transformed_value: None,
                source: None,
                scheduler,
                registry,
            })),
        }
    }

    /// Instantiate and connect.
    pub fn connect(&self) -> Binding {
        let binding = self.instantiate();
        binding.connect();
        binding
    }
}

impl fmt::Debug for BindingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTemplate")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("one_way", &self.one_way)
            .field("no_error", &self.no_error)
            .field("transforms", &self.transforms.len())
            .field("mix", &self.mix)
            .finish()
    }
}

/// Start a template from `from`.
#[must_use]
pub fn bind(from: impl Into<Endpoint>) -> BindingTemplate {
    BindingTemplate::new().from_endpoint(from)
}

/// Template shorthand: `bind!("a.b")` or `bind!("a.b" => "c.d")`.
#[macro_export]
macro_rules! bind {
    ($from:expr => $to:expr) => {
        $crate::reactive::binding::bind($from).to($to)
    };
    ($from:expr) => {
        $crate::reactive::binding::bind($from)
    };
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Resolved {
    target: ObjectRef,
    key: String,
}

impl Resolved {
    fn new(target: &ObjectRef, key: &str) -> Self {
        Self {
            target: Rc::clone(target),
            key: key.to_owned(),
        }
    }

    fn is(&self, target: &ObjectRef, key: &str) -> bool {
        same_object(&self.target, target) && self.key == key
    }
}

/// Where the next applied value is read from.
struct Source {
    target: Option<ObjectRef>,
    key: String,
}

struct BindingInner {
    from: Endpoint,
    to: Endpoint,
    one_way: bool,
    no_error: bool,
    transforms: Rc<[TransformFn]>,
    mix: Option<MixAdapter>,
    state: BindingState,
    sync_on_connect: bool,
    from_resolved: Option<Resolved>,
    to_resolved: Option<Resolved>,
    from_observer: Option<RegistrationId>,
    to_observer: Option<RegistrationId>,
    binding_value: Option<Value>,
    transformed_value: Option<Value>,
    source: Option<Source>,
    scheduler: Scheduler,
    registry: ObserverRegistry,
}

/// A live binding. Clones are handles to the same binding.
#[derive(Clone)]
pub struct Binding {
    id: BindingId,
    inner: Rc<RefCell<BindingInner>>,
}

impl Binding {
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> BindingState {
        self.inner.borrow().state
    }

    /// Connected or waiting to connect.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state(),
            BindingState::ConnectPending | BindingState::Connected
        )
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state() == BindingState::Destroyed
    }

    #[must_use]
    pub fn is_one_way(&self) -> bool {
        self.inner.borrow().one_way
    }

    #[must_use]
    pub fn from_endpoint(&self) -> Endpoint {
        self.inner.borrow().from.clone()
    }

    #[must_use]
    pub fn to_endpoint(&self) -> Endpoint {
        self.inner.borrow().to.clone()
    }

    /// Last raw value applied, `None` before the first application.
    #[must_use]
    pub fn binding_value(&self) -> Option<Value> {
        self.inner.borrow().binding_value.clone()
    }

    /// Last transformed value applied, `None` before the first application.
    #[must_use]
    pub fn transformed_binding_value(&self) -> Option<Value> {
        self.inner.borrow().transformed_value.clone()
    }

    /// Cached object holding the from key, if resolved.
    #[must_use]
    pub fn from_target(&self) -> Option<ObjectRef> {
        self.inner
            .borrow()
            .from_resolved
            .as_ref()
            .map(|r| Rc::clone(&r.target))
    }

    /// Cached object holding the to key, if resolved.
    #[must_use]
    pub fn to_target(&self) -> Option<ObjectRef> {
        self.inner
            .borrow()
            .to_resolved
            .as_ref()
            .map(|r| Rc::clone(&r.target))
    }

    /// Request a connection at the next flush.
    pub fn connect(&self) -> &Self {
        let (scheduler, slots) = {
            let mut inner = self.inner.borrow_mut();
            let state = inner.state;
            match state {
                BindingState::Destroyed => {
                    drop(inner);
                    tracing::warn!(
                        binding = %self.id,
                        "Developer Warning: connect called on a destroyed binding"
                    );
                    return self;
                }
                BindingState::ConnectPending | BindingState::Connected => return self,
                BindingState::Unbound | BindingState::Disconnected => {}
            }
            inner.state = BindingState::ConnectPending;
            inner.sync_on_connect = true;
            (
                inner.scheduler.clone(),
                inner.mix.as_ref().map(MixAdapter::slots),
            )
        };
        for slot in slots.into_iter().flatten() {
            slot.connect();
        }
        scheduler.enqueue_connect(self.clone());
        scheduler.schedule_sync();
        self
    }

    /// Stop relaying changes. Cached targets and values are dropped, so the
    /// next connection starts with a full sync.
    pub fn disconnect(&self) -> &Self {
        let (previous, observers, scheduler, registry, slots) = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.state;
            if !matches!(
                previous,
                BindingState::ConnectPending | BindingState::Connected
            ) {
                return self;
            }
            inner.state = BindingState::Disconnected;
            inner.sync_on_connect = false;
            inner.from_resolved = None;
            inner.to_resolved = None;
            inner.source = None;
            inner.binding_value = None;
            inner.transformed_value = None;
            let observers = [inner.from_observer.take(), inner.to_observer.take()];
            (
                previous,
                observers,
                inner.scheduler.clone(),
                inner.registry.clone(),
                inner.mix.as_ref().map(MixAdapter::slots),
            )
        };

        if previous == BindingState::ConnectPending {
            scheduler.cancel_connect(self.id);
        } else {
            for id in observers.into_iter().flatten() {
                registry.remove_observer(id);
            }
            scheduler.cancel_change(self.id);
        }
        for slot in slots.into_iter().flatten() {
            slot.disconnect();
        }
        tracing::debug!(binding = %self, "binding disconnected");
        self
    }

    /// Disconnect and release every reference the binding holds. Idempotent.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        self.disconnect();
        let mix = {
            let mut inner = self.inner.borrow_mut();
            inner.state = BindingState::Destroyed;
            inner.from.root = None;
            inner.to.root = None;
            inner.transforms = Rc::from(Vec::new());
            inner.mix.take()
        };
        if let Some(mix) = mix {
            mix.destroy();
        }
        tracing::debug!(binding = %self.id, "binding destroyed");
    }

    /// Check the from side against the last applied value and enqueue a
    /// change if it differs. Deferred until connected when pending.
    pub fn sync(&self) -> &Self {
        {
            let mut inner = self.inner.borrow_mut();
            let state = inner.state;
            match state {
                BindingState::ConnectPending => {
                    inner.sync_on_connect = true;
                    return self;
                }
                BindingState::Connected => {}
                _ => return self,
            }
        }

        self.compute_binding_targets();
        let resolved = self.inner.borrow().from_resolved.clone();
        let Some(Resolved { target, key }) = resolved else {
            return self;
        };
        if !target.is_observable() {
            tracing::warn!(
                binding = %self,
                key = %key,
                "Developer Warning: cannot bind to a property on a non-observable object"
            );
            return self;
        }

        let value = target.get(&key);
        let transformed = self.compute_transformed_value(value.clone());
        let scheduler = {
            let mut inner = self.inner.borrow_mut();
            let changed = key == CONTENTS_KEY
                || differs(inner.binding_value.as_ref(), &value)
                || differs(inner.transformed_value.as_ref(), &transformed);
            if !changed {
                return self;
            }
            inner.source = Some(Source {
                target: Some(target),
                key,
            });
            inner.scheduler.clone()
        };
        scheduler.enqueue_change(self.clone());
        scheduler.schedule_sync();
        self
    }

    /// Drained from the connect queue.
    pub(crate) fn connect_now(&self) {
        let (from, to, one_way, registry) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != BindingState::ConnectPending {
                return;
            }
            inner.state = BindingState::Connected;
            (
                inner.from.clone(),
                inner.to.clone(),
                inner.one_way,
                inner.registry.clone(),
            )
        };

        let this = self.clone();
        let on_from: ObserverCallback = Rc::new(move |target: Option<&ObjectRef>, key: &str| {
            this.from_property_did_change(target, key);
        });
        let from_observer = registry.add_observer(&from, to.root.as_ref(), on_from);

        let to_observer = if one_way {
            None
        } else {
            let this = self.clone();
            let on_to: ObserverCallback = Rc::new(move |target: Option<&ObjectRef>, key: &str| {
                this.to_property_did_change(target, key);
            });
            registry.add_observer(&to, from.root.as_ref(), on_to)
        };

        let sync = {
            let mut inner = self.inner.borrow_mut();
            inner.from_observer = from_observer;
            inner.to_observer = to_observer;
            std::mem::take(&mut inner.sync_on_connect)
        };
        tracing::debug!(binding = %self, "binding connected");
        if sync {
            self.sync();
        }
    }

    /// Drained from the change queue: push the recorded source value across.
    pub(crate) fn apply_binding_value(&self) {
        self.compute_binding_targets();
        let source = self
            .inner
            .borrow()
            .source
            .as_ref()
            .and_then(|s| s.target.as_ref().map(|t| (Rc::clone(t), s.key.clone())));
        let value = source.map_or(Value::Null, |(target, key)| target.get(&key));
        let transformed = self.compute_transformed_value(value.clone());

        let (from, to, one_way) = {
            let mut inner = self.inner.borrow_mut();
            // A transform may have disconnected us.
            if inner.state != BindingState::Connected {
                return;
            }
            inner.binding_value = Some(value.clone());
            inner.transformed_value = Some(transformed.clone());
            (
                inner.from_resolved.clone(),
                inner.to_resolved.clone(),
                inner.one_way,
            )
        };

        if settings::log_bindings() {
            tracing::debug!(
                binding = %self,
                value = %value,
                transformed = %transformed,
                "applying binding value"
            );
        }

        if !one_way {
            if let Some(Resolved { target, key }) = from {
                target.set_path_if_changed(&key, value);
            }
        }
        if let Some(Resolved { target, key }) = to {
            target.set_path_if_changed(&key, transformed);
        }
    }

    fn from_property_did_change(&self, target: Option<&ObjectRef>, key: &str) {
        let value = target.map_or(Value::Null, |t| t.get(key));
        let scheduler = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != BindingState::Connected {
                drop(inner);
                self.warn_after_disconnect();
                return;
            }

            // Chain repair reports the current terminal object.
            match target {
                Some(t) if !inner.from_resolved.as_ref().is_some_and(|r| r.is(t, key)) => {
                    inner.from_resolved = Some(Resolved::new(t, key));
                }
                Some(_) => {}
                None => inner.from_resolved = None,
            }

            if key != CONTENTS_KEY && !differs(inner.binding_value.as_ref(), &value) {
                return;
            }
            inner.source = Some(Source {
                target: target.cloned(),
                key: key.to_owned(),
            });
            inner.scheduler.clone()
        };
        scheduler.enqueue_change(self.clone());
        scheduler.schedule_sync();
    }

    fn to_property_did_change(&self, target: Option<&ObjectRef>, key: &str) {
        let value = target.map_or(Value::Null, |t| t.get(key));
        let (scheduler, relocated) = {
            let mut inner = self.inner.borrow_mut();
            if inner.one_way {
                return;
            }
            if inner.state != BindingState::Connected {
                drop(inner);
                self.warn_after_disconnect();
                return;
            }

            let mut relocated = None;
            match target {
                Some(t) if !inner.to_resolved.as_ref().is_some_and(|r| r.is(t, key)) => {
                    inner.to_resolved = Some(Resolved::new(t, key));
                    relocated = inner.mix.clone().map(|mix| (mix, Rc::clone(t)));
                }
                Some(_) => {}
                None => inner.to_resolved = None,
            }

            if !differs(inner.transformed_value.as_ref(), &value) {
                (None, relocated)
            } else {
                inner.source = Some(Source {
                    target: target.cloned(),
                    key: key.to_owned(),
                });
                (Some(inner.scheduler.clone()), relocated)
            }
        };
        if let Some((mix, target)) = relocated {
            mix.set_local_object(&target);
        }
        if let Some(scheduler) = scheduler {
            scheduler.enqueue_change(self.clone());
            scheduler.schedule_sync();
        }
    }

    fn warn_after_disconnect(&self) {
        tracing::warn!(
            binding = %self,
            "Developer Warning: a binding attempted to update after it was disconnected; the update is ignored"
        );
    }

    /// Resolve whichever endpoint is not cached yet.
    fn compute_binding_targets(&self) {
        let (from, to) = {
            let inner = self.inner.borrow();
            let from = inner.from_resolved.is_none().then(|| inner.from.clone());
            let to = inner.to_resolved.is_none().then(|| inner.to.clone());
            if from.is_none() && to.is_none() {
                return;
            }
            (from, to)
        };

        let from_resolved = from.as_ref().and_then(|endpoint| {
            let context = self.inner.borrow().to.root.clone();
            endpoint.resolve(context.as_ref())
        });
        let to_resolved = to.as_ref().and_then(|endpoint| {
            let context = self.inner.borrow().from.root.clone();
            endpoint.resolve(context.as_ref())
        });

        let relocated = {
            let mut inner = self.inner.borrow_mut();
            if let Some((target, key)) = from_resolved {
                inner.from_resolved = Some(Resolved { target, key });
            }
            match to_resolved {
                Some((target, key)) => {
                    let relocated = inner.mix.clone().map(|mix| (mix, Rc::clone(&target)));
                    inner.to_resolved = Some(Resolved { target, key });
                    relocated
                }
                None => None,
            }
        };
        if let Some((mix, target)) = relocated {
            mix.set_local_object(&target);
        }
    }

    fn compute_transformed_value(&self, mut value: Value) -> Value {
        let (transforms, no_error) = {
            let inner = self.inner.borrow();
            (Rc::clone(&inner.transforms), inner.no_error)
        };
        for transform in transforms.iter() {
            value = transform(value, self);
        }
        if no_error && value.is_error() {
            value = Value::Null;
        }
        value
    }
}

fn differs(previous: Option<&Value>, current: &Value) -> bool {
    previous.is_none_or(|prev| !prev.identical(current))
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => write!(
                f,
                "{}({} -> {}){}",
                self.id,
                inner.from,
                inner.to,
                if inner.one_way { "[oneWay]" } else { "" }
            ),
            Err(_) => write!(f, "{}", self.id),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.try_borrow().map(|inner| inner.state).ok();
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingScope
// ---------------------------------------------------------------------------

/// Owns bindings for a logical scope (e.g. a view).
///
/// Dropping the scope destroys every binding it holds, in reverse order.
#[derive(Default)]
pub struct BindingScope {
    bindings: Vec<Binding>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a binding's lifetime.
    pub fn hold(&mut self, binding: Binding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    /// Instantiate, connect and hold a binding.
    pub fn connect(&mut self, template: &BindingTemplate) -> Binding {
        let binding = template.connect();
        self.bindings.push(binding.clone());
        binding
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Destroy all held bindings now. The scope stays usable.
    pub fn clear(&mut self) {
        while let Some(binding) = self.bindings.pop() {
            binding.destroy();
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.bindings.len())
            .finish()
    }
}

#![forbid(unsafe_code)]

//! Path observer registry with chain repair and suspendable delivery.
//!
//! An observer registration watches a dotted path from a root object. The
//! registry subscribes a key observer on **every** object along the path, so
//! when an intermediate link is replaced (e.g. `owner` is reassigned in
//! `owner.value`) the links after it are torn down and rebuilt on the new
//! chain, and the callback fires if the terminal value changed.
//!
//! # Suspension
//!
//! [`ObserverRegistry::suspend`] withholds callbacks. Each notification is
//! recorded against its registration (lowest changed link plus whether the
//! terminal key itself was touched). [`ObserverRegistry::deliver_pending`]
//! delivers the recorded notifications once each, and the outermost
//! [`ObserverRegistry::resume`] delivers whatever remains. Nothing is
//! dropped; several notifications for one registration coalesce into one.
//!
//! # Invariants
//!
//! 1. A registration owns exactly one key observer per reachable observable
//!    link and none on objects that are no longer part of its chain.
//! 2. Callbacks never run while the registry or a chain is borrowed.
//! 3. A terminal-key notification always reaches the callback; an
//!    intermediate one reaches it only if the terminal value changed
//!    identity.
//! 4. `remove_observer` also discards pending notifications for that
//!    registration.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Intermediate unset / not an object | chain stops there; terminal reads as absent |
//! | Non-observable object in the chain | developer warning; observation stops at that link |
//! | No root available | `add_observer` returns `None` |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tether_core::{Endpoint, KeyObserverId, ObjectRef, Value, resolve_segments};

/// Callback receiving the current terminal target (if the path resolves)
/// and the terminal key.
pub type ObserverCallback = Rc<dyn Fn(Option<&ObjectRef>, &str)>;

/// Identifies one observer registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

struct Link {
    object: ObjectRef,
    key: String,
    observer: KeyObserverId,
}

struct Chain {
    root: ObjectRef,
    segments: Vec<String>,
    links: Vec<Link>,
    last_value: Value,
    callback: ObserverCallback,
}

impl Chain {
    fn terminal(&self) -> Option<(ObjectRef, String)> {
        resolve_segments(&self.root, &self.segments)
    }

    fn unsubscribe_from(&mut self, index: usize) {
        for link in self.links.drain(index..) {
            link.object.unobserve_key(&link.key, link.observer);
        }
    }

    /// Subscribe links `start..` beginning at `object`.
    fn subscribe_from(
        &mut self,
        start: usize,
        mut object: ObjectRef,
        id: RegistrationId,
        registry: &Weak<RefCell<RegistryInner>>,
    ) {
        for index in start..self.segments.len() {
            let key = self.segments[index].clone();
            if !object.is_observable() {
                tracing::warn!(
                    registration = id.0,
                    key = %key,
                    "Developer Warning: cannot observe key on a non-observable object"
                );
                return;
            }
            let weak = Weak::clone(registry);
            let observer = object.observe_key(
                &key,
                Rc::new(move |_changed: &str| {
                    if let Some(inner) = weak.upgrade() {
                        ObserverRegistry { inner }.link_changed(id, index);
                    }
                }),
            );
            let Some(observer) = observer else {
                return;
            };
            let next = object.get(&key);
            self.links.push(Link {
                object,
                key,
                observer,
            });
            object = match next {
                Value::Object(next) => next,
                _ => return,
            };
        }
    }
}

#[derive(Clone, Copy)]
struct PendingChange {
    lowest_link: usize,
    terminal_touched: bool,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    chains: AHashMap<RegistrationId, Rc<RefCell<Chain>>>,
    suspended: u32,
    pending_order: Vec<RegistrationId>,
    pending: AHashMap<RegistrationId, PendingChange>,
}

/// Path observer registry. Cloning yields another handle to the same
/// registry.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

thread_local! {
    static GLOBAL_REGISTRY: ObserverRegistry = ObserverRegistry::new();
}

impl ObserverRegistry {
    /// Create an empty, independent registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The thread-local registry used by bindings.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_REGISTRY.with(Clone::clone)
    }

    /// Observe `endpoint`. `context` is the root used by partner-relative
    /// paths when the endpoint has no explicit root.
    ///
    /// Returns `None` if no root can be determined or the path is empty.
    pub fn add_observer(
        &self,
        endpoint: &Endpoint,
        context: Option<&ObjectRef>,
        callback: ObserverCallback,
    ) -> Option<RegistrationId> {
        if endpoint.path.is_empty() {
            return None;
        }
        let root = endpoint.effective_root(context)?;
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            RegistrationId(inner.next_id)
        };

        let mut chain = Chain {
            root: Rc::clone(&root),
            segments: endpoint.path.segments().to_vec(),
            links: Vec::new(),
            last_value: Value::Null,
            callback,
        };
        chain.subscribe_from(0, root, id, &Rc::downgrade(&self.inner));
        chain.last_value = chain
            .terminal()
            .map_or(Value::Null, |(target, key)| target.get(&key));

        self.inner
            .borrow_mut()
            .chains
            .insert(id, Rc::new(RefCell::new(chain)));
        Some(id)
    }

    /// Remove a registration and all its key observers. Unknown ids are
    /// ignored.
    pub fn remove_observer(&self, id: RegistrationId) {
        let chain = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending.remove(&id).is_some() {
                inner.pending_order.retain(|pending| *pending != id);
            }
            inner.chains.remove(&id)
        };
        if let Some(chain) = chain {
            chain.borrow_mut().unsubscribe_from(0);
        }
    }

    /// Number of live registrations.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.inner.borrow().chains.len()
    }

    /// Number of key observers currently held by a registration.
    #[must_use]
    pub fn link_count(&self, id: RegistrationId) -> usize {
        self.inner
            .borrow()
            .chains
            .get(&id)
            .map_or(0, |chain| chain.borrow().links.len())
    }

    /// Withhold callback delivery. Nestable.
    pub fn suspend(&self) {
        self.inner.borrow_mut().suspended += 1;
    }

    /// Undo one [`suspend`](Self::suspend). The outermost resume delivers
    /// every pending notification.
    pub fn resume(&self) {
        let now_live = {
            let mut inner = self.inner.borrow_mut();
            inner.suspended = inner.suspended.saturating_sub(1);
            inner.suspended == 0
        };
        if now_live {
            while self.deliver_pending() > 0 {}
        }
    }

    /// Whether delivery is currently suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.inner.borrow().suspended > 0
    }

    /// Number of registrations with a withheld notification.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending_order.len()
    }

    /// Deliver the notifications recorded so far, once per registration.
    /// Notifications raised during delivery stay pending if the registry is
    /// still suspended. Returns the number delivered.
    pub fn deliver_pending(&self) -> usize {
        let batch: Vec<(RegistrationId, PendingChange)> = {
            let mut inner = self.inner.borrow_mut();
            let order = std::mem::take(&mut inner.pending_order);
            let mut pending = std::mem::take(&mut inner.pending);
            order
                .into_iter()
                .filter_map(|id| pending.remove(&id).map(|change| (id, change)))
                .collect()
        };
        let delivered = batch.len();
        for (id, change) in batch {
            self.process(id, change);
        }
        delivered
    }

    fn link_changed(&self, id: RegistrationId, link: usize) {
        let change = {
            let Some(chain) = self.inner.borrow().chains.get(&id).cloned() else {
                return;
            };
            let terminal = chain.borrow().segments.len().saturating_sub(1);
            PendingChange {
                lowest_link: link,
                terminal_touched: link == terminal,
            }
        };

        {
            let mut inner = self.inner.borrow_mut();
            if inner.suspended > 0 {
                if let Some(existing) = inner.pending.get_mut(&id) {
                    existing.lowest_link = existing.lowest_link.min(change.lowest_link);
                    existing.terminal_touched |= change.terminal_touched;
                } else {
                    inner.pending.insert(id, change);
                    inner.pending_order.push(id);
                }
                return;
            }
        }
        self.process(id, change);
    }

    fn process(&self, id: RegistrationId, change: PendingChange) {
        let Some(chain) = self.inner.borrow().chains.get(&id).cloned() else {
            return;
        };

        let fire = {
            let mut chain = chain.borrow_mut();
            let segment_count = chain.segments.len();
            let index = change.lowest_link;
            if index + 1 < segment_count && index < chain.links.len() {
                let changed_object = Rc::clone(&chain.links[index].object);
                let next = changed_object.get(&chain.segments[index]);
                chain.unsubscribe_from(index + 1);
                if let Value::Object(next) = next {
                    chain.subscribe_from(index + 1, next, id, &Rc::downgrade(&self.inner));
                }
            }

            let terminal = chain.terminal();
            let value = terminal
                .as_ref()
                .map_or(Value::Null, |(target, key)| target.get(key));
            let changed = !value.identical(&chain.last_value);
            chain.last_value = value;
            if changed || change.terminal_touched {
                let key = terminal
                    .as_ref()
                    .map_or_else(|| chain.segments[segment_count - 1].clone(), |(_, k)| k.clone());
                Some((Rc::clone(&chain.callback), terminal.map(|(t, _)| t), key))
            } else {
                None
            }
        };

        if let Some((callback, target, key)) = fire {
            callback(target.as_ref(), &key);
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObserverRegistry")
            .field("registrations", &inner.chains.len())
            .field("suspended", &inner.suspended)
            .field("pending", &inner.pending_order.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tether_core::{CONTENTS_KEY, PropertyAccess, Record, same_object};

    fn recorder() -> (Rc<RefCell<Vec<Value>>>, ObserverCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let cb: ObserverCallback = Rc::new(move |target: Option<&ObjectRef>, key: &str| {
            let value = target.map_or(Value::Null, |t| t.get(key));
            s.borrow_mut().push(value);
        });
        (seen, cb)
    }

    #[test]
    fn single_segment_observation() {
        let registry = ObserverRegistry::new();
        let obj = Record::shared();
        let (seen, cb) = recorder();
        let id = registry
            .add_observer(&Endpoint::rooted(obj.clone(), "title"), None, cb)
            .unwrap();
        assert_eq!(registry.link_count(id), 1);

        obj.set("title", Value::from("x"));
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].identical(&Value::from("x")));
    }

    #[test]
    fn chain_subscribes_every_link() {
        let registry = ObserverRegistry::new();
        let owner = Record::with_values([("value", 1)]);
        let root = Record::with_values([("owner", Value::Object(owner.clone()))]);
        let (_seen, cb) = recorder();
        let id = registry
            .add_observer(&Endpoint::rooted(root.clone(), "owner.value"), None, cb)
            .unwrap();
        assert_eq!(registry.link_count(id), 2);
        assert_eq!(root.observer_count("owner"), 1);
        assert_eq!(owner.observer_count("value"), 1);
    }

    #[test]
    fn replacing_intermediate_repairs_chain() {
        let registry = ObserverRegistry::new();
        let old_owner = Record::with_values([("value", 1)]);
        let new_owner = Record::with_values([("value", 2)]);
        let root = Record::with_values([("owner", Value::Object(old_owner.clone()))]);
        let (seen, cb) = recorder();
        registry
            .add_observer(&Endpoint::rooted(root.clone(), "owner.value"), None, cb)
            .unwrap();

        root.set("owner", Value::Object(new_owner.clone()));
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].identical(&Value::from(2)));
        assert_eq!(old_owner.observer_count("value"), 0);
        assert_eq!(new_owner.observer_count("value"), 1);

        old_owner.set("value", Value::from(10));
        assert_eq!(seen.borrow().len(), 1, "old owner no longer observed");

        new_owner.set("value", Value::from(3));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn intermediate_swap_with_same_terminal_value_is_silent() {
        let registry = ObserverRegistry::new();
        let a = Record::with_values([("value", 7)]);
        let b = Record::with_values([("value", 7)]);
        let root = Record::with_values([("owner", Value::Object(a))]);
        let (seen, cb) = recorder();
        registry
            .add_observer(&Endpoint::rooted(root.clone(), "owner.value"), None, cb)
            .unwrap();

        root.set("owner", Value::Object(b));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn vanished_intermediate_reports_absent_target() {
        let registry = ObserverRegistry::new();
        let owner = Record::with_values([("value", 1)]);
        let root = Record::with_values([("owner", Value::Object(owner))]);
        let targets = Rc::new(Cell::new(0));
        let t = Rc::clone(&targets);
        let cb: ObserverCallback = Rc::new(move |target: Option<&ObjectRef>, key: &str| {
            assert!(target.is_none());
            assert_eq!(key, "value");
            t.set(t.get() + 1);
        });
        let id = registry
            .add_observer(&Endpoint::rooted(root.clone(), "owner.value"), None, cb)
            .unwrap();

        root.set("owner", Value::Null);
        assert_eq!(targets.get(), 1);
        assert_eq!(registry.link_count(id), 1);
    }

    #[test]
    fn remove_observer_unsubscribes_all_links() {
        let registry = ObserverRegistry::new();
        let owner = Record::with_values([("value", 1)]);
        let root = Record::with_values([("owner", Value::Object(owner.clone()))]);
        let (seen, cb) = recorder();
        let id = registry
            .add_observer(&Endpoint::rooted(root.clone(), "owner.value"), None, cb)
            .unwrap();

        registry.remove_observer(id);
        assert_eq!(registry.registration_count(), 0);
        assert_eq!(root.total_observer_count(), 0);
        assert_eq!(owner.total_observer_count(), 0);
        owner.set("value", Value::from(5));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn suspended_notifications_coalesce_and_deliver_once() {
        let registry = ObserverRegistry::new();
        let obj = Record::shared();
        let (seen, cb) = recorder();
        registry
            .add_observer(&Endpoint::rooted(obj.clone(), "v"), None, cb)
            .unwrap();

        registry.suspend();
        obj.set("v", Value::from(1));
        obj.set("v", Value::from(2));
        assert!(seen.borrow().is_empty());
        assert_eq!(registry.pending_count(), 1);

        registry.resume();
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].identical(&Value::from(2)));
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn nested_suspend_delivers_on_outermost_resume() {
        let registry = ObserverRegistry::new();
        let obj = Record::shared();
        let (seen, cb) = recorder();
        registry
            .add_observer(&Endpoint::rooted(obj.clone(), "v"), None, cb)
            .unwrap();

        registry.suspend();
        registry.suspend();
        obj.set("v", Value::from(1));
        registry.resume();
        assert!(seen.borrow().is_empty());
        registry.resume();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn deliver_pending_while_suspended() {
        let registry = ObserverRegistry::new();
        let obj = Record::shared();
        let (seen, cb) = recorder();
        registry
            .add_observer(&Endpoint::rooted(obj.clone(), "v"), None, cb)
            .unwrap();

        registry.suspend();
        obj.set("v", Value::from(1));
        assert_eq!(registry.deliver_pending(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert!(registry.is_suspended());
        registry.resume();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn removal_discards_pending() {
        let registry = ObserverRegistry::new();
        let obj = Record::shared();
        let (seen, cb) = recorder();
        let id = registry
            .add_observer(&Endpoint::rooted(obj.clone(), "v"), None, cb)
            .unwrap();

        registry.suspend();
        obj.set("v", Value::from(1));
        registry.remove_observer(id);
        registry.resume();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn contents_key_always_fires() {
        let registry = ObserverRegistry::new();
        let list = Record::shared();
        let holder = Record::with_values([("content", Value::Object(list.clone()))]);
        let (seen, cb) = recorder();
        let path = format!("content.{CONTENTS_KEY}");
        registry
            .add_observer(&Endpoint::rooted(holder, path.as_str()), None, cb)
            .unwrap();

        list.notify_property_change(CONTENTS_KEY);
        list.notify_property_change(CONTENTS_KEY);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn callback_receives_repaired_target() {
        let registry = ObserverRegistry::new();
        let a = Record::with_values([("value", 1)]);
        let b = Record::with_values([("value", 2)]);
        let root = Record::with_values([("owner", Value::Object(a))]);
        let last = Rc::new(RefCell::new(None::<ObjectRef>));
        let l = Rc::clone(&last);
        let cb: ObserverCallback = Rc::new(move |target: Option<&ObjectRef>, _: &str| {
            *l.borrow_mut() = target.cloned();
        });
        registry
            .add_observer(&Endpoint::rooted(root.clone(), "owner.value"), None, cb)
            .unwrap();

        root.set("owner", Value::Object(b.clone()));
        let expected: ObjectRef = b;
        assert!(same_object(last.borrow().as_ref().unwrap(), &expected));
    }

    #[test]
    fn partner_relative_needs_context() {
        let registry = ObserverRegistry::new();
        let (_seen, cb) = recorder();
        assert!(
            registry
                .add_observer(&Endpoint::new(".value"), None, Rc::clone(&cb))
                .is_none()
        );
        let ctx: ObjectRef = Record::shared();
        assert!(
            registry
                .add_observer(&Endpoint::new(".value"), Some(&ctx), cb)
                .is_some()
        );
    }
}

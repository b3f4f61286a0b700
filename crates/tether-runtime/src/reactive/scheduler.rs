#![forbid(unsafe_code)]

//! Tick scheduler: batches binding connections and changes into one flush.
//!
//! Bindings never push values synchronously. A change notification puts the
//! binding on the change queue, and the queue is drained when the outermost
//! tick ends ([`Scheduler::end`]) or, when no tick is open, by a deferred
//! tick the embedder runs from its event loop
//! ([`Scheduler::run_scheduled_tick`]).
//!
//! # Queues
//!
//! The connect queue and the change queue are each double-buffered. A drain
//! pass swaps the active buffer out and works through the swapped buffer in
//! FIFO order, so bindings enqueued during the pass land in the next pass. A
//! binding appears at most once per buffer.
//!
//! # Invariants
//!
//! 1. At most one flush runs at a time; a nested flush returns `false`.
//! 2. Within a pass, bindings are applied in enqueue order.
//! 3. A binding that is no longer connected when its turn comes is skipped.
//! 4. Property observation is suspended for the whole flush. Notifications
//!    raised by a pass are delivered after it, feeding the next pass.
//! 5. `end` returns only when a flush applies nothing (quiescence). A graph
//!    whose transforms never converge keeps `end` looping.
//! 6. A panic escaping a transform still closes the tick and resumes the
//!    registry. The rest of that pass stays queued for the next tick.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use ahash::AHashSet;

use super::binding::{Binding, BindingId, BindingState};
use super::registry::ObserverRegistry;
use crate::settings;

/// Callback the scheduler invokes when a deferred tick is needed.
pub type DeferredTrigger = Rc<dyn Fn()>;

/// FIFO queue with set semantics keyed by binding id.
#[derive(Default)]
struct BindingQueue {
    order: VecDeque<Binding>,
    members: AHashSet<BindingId>,
}

impl BindingQueue {
    fn push(&mut self, binding: Binding) -> bool {
        if !self.members.insert(binding.id()) {
            return false;
        }
        self.order.push_back(binding);
        true
    }

    fn pop(&mut self) -> Option<Binding> {
        let binding = self.order.pop_front()?;
        self.members.remove(&binding.id());
        Some(binding)
    }

    fn remove(&mut self, id: BindingId) {
        if self.members.remove(&id) {
            self.order.retain(|b| b.id() != id);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Active plus alternate buffer.
#[derive(Default)]
struct DoubleQueue {
    active: RefCell<BindingQueue>,
    draining: RefCell<BindingQueue>,
}

impl DoubleQueue {
    fn push(&self, binding: Binding) -> bool {
        self.active.borrow_mut().push(binding)
    }

    fn remove(&self, id: BindingId) {
        self.active.borrow_mut().remove(id);
        self.draining.borrow_mut().remove(id);
    }

    /// Move the active buffer into the draining slot. Returns `false` if
    /// there was nothing to drain. Leftovers from an interrupted pass are
    /// drained first.
    fn swap(&self) -> bool {
        if !self.draining.borrow().is_empty() {
            return true;
        }
        let mut active = self.active.borrow_mut();
        if active.is_empty() {
            return false;
        }
        let mut draining = self.draining.borrow_mut();
        std::mem::swap(&mut *active, &mut *draining);
        true
    }

    fn pop_draining(&self) -> Option<Binding> {
        self.draining.borrow_mut().pop()
    }

    fn len(&self) -> usize {
        self.active.borrow().len() + self.draining.borrow().len()
    }

    fn is_empty(&self) -> bool {
        self.active.borrow().is_empty() && self.draining.borrow().is_empty()
    }
}

struct SchedulerInner {
    depth: Cell<u32>,
    flushing: Cell<bool>,
    sync_scheduled: Cell<bool>,
    passes: Cell<u64>,
    connects: DoubleQueue,
    changes: DoubleQueue,
    trigger: RefCell<Option<DeferredTrigger>>,
    registry: ObserverRegistry,
}

/// Handle to the thread's binding scheduler. Clones share state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

thread_local! {
    static GLOBAL_SCHEDULER: Scheduler = Scheduler::with_registry(ObserverRegistry::global());
}

impl Scheduler {
    fn with_registry(registry: ObserverRegistry) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                depth: Cell::new(0),
                flushing: Cell::new(false),
                sync_scheduled: Cell::new(false),
                passes: Cell::new(0),
                connects: DoubleQueue::default(),
                changes: DoubleQueue::default(),
                trigger: RefCell::new(None),
                registry,
            }),
        }
    }

    /// The thread-local scheduler all bindings use.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_SCHEDULER.with(Clone::clone)
    }

    /// Open a tick. Ticks nest.
    pub fn begin(&self) {
        self.inner.depth.set(self.inner.depth.get() + 1);
    }

    /// Close a tick. Closing the outermost tick flushes until nothing is
    /// left to apply. Unbalanced calls are ignored.
    pub fn end(&self) {
        let depth = self.inner.depth.get();
        if depth == 0 {
            return;
        }
        // Restores the depth even if a transform panics mid-flush.
        let _close = CloseTick {
            inner: &self.inner,
            depth: depth - 1,
        };
        if depth == 1 {
            while self.flush_pending_changes() {}
        }
    }

    /// Close a tick without flushing. Queued work waits for the next tick.
    fn abandon(&self) {
        let depth = self.inner.depth.get();
        if depth > 0 {
            drop(CloseTick {
                inner: &self.inner,
                depth: depth - 1,
            });
        }
    }

    /// Whether a tick is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.depth.get() > 0
    }

    /// Run `f` inside a tick.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _tick = self.tick();
        f()
    }

    /// Open a tick that closes when the guard drops.
    #[must_use = "the tick closes as soon as the guard is dropped"]
    pub fn tick(&self) -> TickGuard {
        self.begin();
        TickGuard {
            scheduler: self.clone(),
        }
    }

    /// Drain the connect and change queues.
    ///
    /// Returns `true` if at least one binding value was applied. Returns
    /// `false` without doing anything if a flush is already running.
    pub fn flush_pending_changes(&self) -> bool {
        if self.inner.flushing.replace(true) {
            return false;
        }
        let registry = &self.inner.registry;
        registry.suspend();
        let _flush = FlushGuard { inner: &self.inner };

        let mut did_flush = false;
        loop {
            self.drain_connects();

            if !self.inner.changes.swap() {
                // Deferred notifications may enqueue more work.
                if registry.deliver_pending() > 0 {
                    continue;
                }
                if !self.inner.connects.is_empty() {
                    continue;
                }
                break;
            }

            did_flush = true;
            let pass = self.inner.passes.get() + 1;
            self.inner.passes.set(pass);
            let log = settings::log_bindings();
            if log {
                tracing::debug!(pass, "begin: trigger changed bindings");
            }

            while let Some(binding) = self.inner.changes.pop_draining() {
                if binding.state() == BindingState::Connected {
                    binding.apply_binding_value();
                }
            }

            if log {
                tracing::debug!(pass, "end: trigger changed bindings");
            }
            registry.deliver_pending();
        }

        did_flush
    }

    fn drain_connects(&self) {
        while self.inner.connects.swap() {
            while let Some(binding) = self.inner.connects.pop_draining() {
                binding.connect_now();
            }
        }
    }

    /// Register the callback used to request a deferred tick. The trigger
    /// should arrange for [`run_scheduled_tick`](Self::run_scheduled_tick) to
    /// be called soon, outside the current call stack.
    pub fn set_deferred_trigger(&self, trigger: impl Fn() + 'static) {
        *self.inner.trigger.borrow_mut() = Some(Rc::new(trigger));
    }

    /// Remove the deferred trigger.
    pub fn clear_deferred_trigger(&self) {
        self.inner.trigger.borrow_mut().take();
    }

    /// Whether a deferred tick has been requested and not yet run.
    #[must_use]
    pub fn is_sync_scheduled(&self) -> bool {
        self.inner.sync_scheduled.get()
    }

    /// Run one (empty) tick now, flushing whatever is queued. Returns whether
    /// a deferred tick had been requested.
    pub fn run_scheduled_tick(&self) -> bool {
        let was_scheduled = self.inner.sync_scheduled.replace(false);
        self.run(|| ());
        was_scheduled
    }

    /// Request a deferred tick unless one is open, a flush is running, or a
    /// tick is already requested.
    pub fn schedule_sync(&self) {
        if self.is_active() || self.inner.flushing.get() || self.inner.sync_scheduled.get() {
            return;
        }
        self.inner.sync_scheduled.set(true);
        let trigger = self.inner.trigger.borrow().clone();
        if let Some(trigger) = trigger {
            trigger();
        }
    }

    /// Bindings waiting to connect.
    #[must_use]
    pub fn pending_connects(&self) -> usize {
        self.inner.connects.len()
    }

    /// Bindings waiting to apply a change.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.inner.changes.len()
    }

    /// Total number of change passes run on this scheduler.
    #[must_use]
    pub fn pass_count(&self) -> u64 {
        self.inner.passes.get()
    }

    /// The registry this scheduler suspends while flushing.
    #[must_use]
    pub fn registry(&self) -> &ObserverRegistry {
        &self.inner.registry
    }

    pub(crate) fn enqueue_connect(&self, binding: Binding) {
        self.inner.connects.push(binding);
    }

    pub(crate) fn cancel_connect(&self, id: BindingId) {
        self.inner.connects.remove(id);
    }

    pub(crate) fn enqueue_change(&self, binding: Binding) {
        self.inner.changes.push(binding);
    }

    pub(crate) fn cancel_change(&self, id: BindingId) {
        self.inner.changes.remove(id);
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("depth", &self.inner.depth.get())
            .field("flushing", &self.inner.flushing.get())
            .field("sync_scheduled", &self.inner.sync_scheduled.get())
            .field("pending_connects", &self.pending_connects())
            .field("pending_changes", &self.pending_changes())
            .finish()
    }
}

/// Sets the tick depth on drop. Leaving the outermost tick with empty queues
/// also clears a requested deferred tick.
struct CloseTick<'a> {
    inner: &'a SchedulerInner,
    depth: u32,
}

impl Drop for CloseTick<'_> {
    fn drop(&mut self) {
        self.inner.depth.set(self.depth);
        if self.depth == 0 && self.inner.changes.is_empty() && self.inner.connects.is_empty() {
            self.inner.sync_scheduled.set(false);
        }
    }
}

/// Ends a flush: clears the flushing flag and resumes the registry.
struct FlushGuard<'a> {
    inner: &'a SchedulerInner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.inner.flushing.set(false);
        self.inner.registry.resume();
    }
}

/// RAII tick. Dropping it calls [`Scheduler::end`]. While unwinding the
/// tick is closed without a flush.
pub struct TickGuard {
    scheduler: Scheduler,
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.scheduler.abandon();
        } else {
            self.scheduler.end();
        }
    }
}

impl fmt::Debug for TickGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::binding::bind;
    use std::cell::Cell;
    use tether_core::{PropertyAccess, Record, Value};

    #[test]
    fn ticks_nest_and_flush_on_outermost_end() {
        let scheduler = Scheduler::global();
        let source = Record::with_values([("v", 1)]);
        let target = Record::shared();

        scheduler.begin();
        scheduler.begin();
        let binding = bind(tether_core::Endpoint::rooted(source.clone(), "v"))
            .to_root(target.clone(), "v")
            .connect();
        scheduler.end();
        assert!(scheduler.is_active());
        assert!(target.get("v").is_none());
        scheduler.end();
        assert!(!scheduler.is_active());
        assert!(target.get("v").identical(&Value::from(1)));
        binding.destroy();
    }

    #[test]
    fn unbalanced_end_is_ignored() {
        let scheduler = Scheduler::global();
        scheduler.end();
        assert!(!scheduler.is_active());
    }

    #[test]
    fn schedule_sync_calls_trigger_once() {
        let scheduler = Scheduler::global();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        scheduler.set_deferred_trigger(move || c.set(c.get() + 1));

        scheduler.schedule_sync();
        scheduler.schedule_sync();
        assert_eq!(calls.get(), 1);
        assert!(scheduler.is_sync_scheduled());

        assert!(scheduler.run_scheduled_tick());
        assert!(!scheduler.is_sync_scheduled());
        assert!(!scheduler.run_scheduled_tick());
        scheduler.clear_deferred_trigger();
    }

    #[test]
    fn schedule_sync_is_silent_inside_a_tick() {
        let scheduler = Scheduler::global();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        scheduler.set_deferred_trigger(move || c.set(c.get() + 1));
        scheduler.run(|| scheduler.schedule_sync());
        assert_eq!(calls.get(), 0);
        scheduler.clear_deferred_trigger();
    }

    #[test]
    fn nested_flush_returns_false() {
        let scheduler = Scheduler::global();
        let nested = Rc::new(Cell::new(None));
        let source = Record::with_values([("v", 1)]);
        let target = Record::shared();
        let n = Rc::clone(&nested);
        let binding = bind(tether_core::Endpoint::rooted(source, "v"))
            .to_root(target, "v")
            .transform(move |v: Value, _: &Binding| {
                n.set(Some(Scheduler::global().flush_pending_changes()));
                v
            })
            .instantiate();
        scheduler.run(|| {
            binding.connect();
        });
        assert_eq!(nested.get(), Some(false));
        binding.destroy();
    }

    #[test]
    fn panicking_transform_leaves_scheduler_usable() {
        let scheduler = Scheduler::global();
        let source = Record::with_values([("v", 1)]);
        let faulty = scheduler.run(|| {
            bind(tether_core::Endpoint::rooted(source.clone(), "v"))
                .to_root(Record::shared(), "v")
                .one_way(true)
                .transform(|v: Value, _: &Binding| {
                    assert!(!v.identical(&Value::from(2)), "transform rejects 2");
                    v
                })
                .connect()
        });
        let bystander_target = Record::shared();
        let bystander = scheduler.run(|| {
            bind(tether_core::Endpoint::rooted(source.clone(), "v"))
                .to_root(bystander_target.clone(), "v")
                .one_way(true)
                .connect()
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.run(|| source.set("v", Value::from(2)));
        }));
        assert!(outcome.is_err());
        assert!(!scheduler.is_active());
        assert!(!scheduler.registry().is_suspended());
        faulty.destroy();

        // The interrupted pass is finished by the next tick.
        assert_eq!(scheduler.pending_changes(), 1);
        scheduler.run(|| {});
        assert!(bystander_target.get("v").identical(&Value::from(2)));
        bystander.destroy();

        let other = Record::with_values([("v", "x")]);
        let target = Record::shared();
        let healthy = scheduler.run(|| {
            bind(tether_core::Endpoint::rooted(other.clone(), "v"))
                .to_root(target.clone(), "v")
                .connect()
        });
        assert_eq!(healthy.state(), BindingState::Connected);
        assert!(target.get("v").identical(&Value::from("x")));

        scheduler.run(|| other.set("v", Value::from("y")));
        assert!(target.get("v").identical(&Value::from("y")));
        healthy.destroy();
    }

    #[test]
    fn panic_inside_a_tick_closes_it_without_flushing() {
        let scheduler = Scheduler::global();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.run(|| panic!("caller failed"));
        }));
        assert!(outcome.is_err());
        assert!(!scheduler.is_active());
    }

    #[test]
    fn outermost_tick_clears_requested_deferred_tick() {
        let scheduler = Scheduler::global();
        let source = Record::with_values([("v", "x")]);
        let target = Record::shared();

        // No trigger installed yet: the request is only recorded.
        let binding = bind(tether_core::Endpoint::rooted(source.clone(), "v"))
            .to_root(target.clone(), "v")
            .connect();
        assert!(scheduler.is_sync_scheduled());
        scheduler.run(|| {});
        assert!(!scheduler.is_sync_scheduled());
        assert!(target.get("v").identical(&Value::from("x")));

        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        scheduler.set_deferred_trigger(move || c.set(c.get() + 1));
        source.set("v", Value::from("y"));
        assert_eq!(calls.get(), 1);
        assert_eq!(scheduler.pending_changes(), 1);

        assert!(scheduler.run_scheduled_tick());
        assert!(target.get("v").identical(&Value::from("y")));
        scheduler.clear_deferred_trigger();
        binding.destroy();
    }

    #[test]
    fn queue_keeps_fifo_and_set_semantics() {
        let a = bind("schedQueueA").to("schedQueueB").instantiate();
        let b = bind("schedQueueC").to("schedQueueD").instantiate();
        let mut queue = BindingQueue::default();
        assert!(queue.push(a.clone()));
        assert!(queue.push(b.clone()));
        assert!(!queue.push(a.clone()));
        assert_eq!(queue.len(), 2);

        queue.remove(a.id());
        assert_eq!(queue.pop().map(|x| x.id()), Some(b.id()));
        assert!(queue.pop().is_none());
        assert!(queue.push(a));
    }

    #[test]
    fn flush_applies_in_enqueue_order() {
        let scheduler = Scheduler::global();
        let order = Rc::new(RefCell::new(Vec::new()));
        let source = Record::with_values([("v", 1)]);
        let mut bindings = Vec::new();
        for label in ["first", "second", "third"] {
            let o = Rc::clone(&order);
            let target = Record::shared();
            bindings.push(
                bind(tether_core::Endpoint::rooted(source.clone(), "v"))
                    .to_root(target, "v")
                    .one_way(true)
                    .transform(move |v: Value, _: &Binding| {
                        o.borrow_mut().push(label);
                        v
                    })
                    .instantiate(),
            );
        }
        scheduler.run(|| {
            for b in &bindings {
                b.connect();
            }
        });
        order.borrow_mut().clear();

        scheduler.run(|| source.set("v", Value::from(2)));
        let seen = order.borrow().clone();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen, ["first", "second", "third"]);
        for b in bindings {
            b.destroy();
        }
    }
}

//! Developer warnings are emitted through `tracing`.

use std::fmt;
use std::sync::{Arc, Mutex};

use tether_core::{Endpoint, PropertyAccess, Record, Value};
use tether_runtime::reactive::{BindingTemplate, Scheduler, bind};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<String>>>);

impl Captured {
    fn messages(&self) -> Vec<String> {
        self.0.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        if let Ok(mut messages) = self.0.lock() {
            messages.push(visitor.0);
        }
    }
}

fn capture(f: impl FnOnce()) -> Captured {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());
    tracing::subscriber::with_default(subscriber, f);
    captured
}

/// Readable and writable, but offers no key observation.
struct Opaque(std::cell::RefCell<Value>);

impl PropertyAccess for Opaque {
    fn get(&self, _key: &str) -> Value {
        self.0.borrow().clone()
    }

    fn set(&self, _key: &str, value: Value) {
        *self.0.borrow_mut() = value;
    }
}

#[test]
fn binding_to_non_observable_object_warns() {
    let opaque = std::rc::Rc::new(Opaque(std::cell::RefCell::new(Value::from(5))));
    let target = Record::shared();
    let captured = capture(|| {
        let binding = Scheduler::global().run(|| {
            bind(Endpoint::rooted(opaque.clone(), "anything"))
                .to_root(target.clone(), "v")
                .one_way(true)
                .connect()
        });
        binding.destroy();
    });
    assert!(captured.contains("non-observable"));
    assert!(target.get("v").is_none());
}

#[test]
fn connect_after_destroy_warns() {
    let captured = capture(|| {
        let binding = bind("warnDestroyed.a").to("warnDestroyed.b").instantiate();
        binding.destroy();
        binding.connect();
    });
    assert!(captured.contains("destroyed binding"));
}

#[test]
fn mix_with_one_path_warns() {
    let captured = capture(|| {
        let _ = BindingTemplate::new().mix(["warnMix.only"], |v: &[Value]| v[0].clone());
    });
    assert!(captured.contains("at least two source paths"));
}

#[test]
fn well_formed_binding_is_silent() {
    let source = Record::with_values([("v", 1)]);
    let target = Record::shared();
    let captured = capture(|| {
        let binding = Scheduler::global().run(|| {
            bind(Endpoint::rooted(source.clone(), "v"))
                .to_root(target.clone(), "v")
                .connect()
        });
        Scheduler::global().run(|| source.set("v", Value::from(2)));
        binding.destroy();
    });
    assert!(captured.messages().is_empty(), "{:?}", captured.messages());
    assert!(target.get("v").identical(&Value::from(2)));
}

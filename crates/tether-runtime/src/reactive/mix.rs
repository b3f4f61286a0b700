#![forbid(unsafe_code)]

//! N-ary aggregation for `and`, `or` and `mix` bindings.
//!
//! A mix binding does not read a single property. Instead each source path
//! is bound one-way into a slot (`value0`, `value1`, ...) on a private
//! adapter record, the adapter recomputes `aggregate` whenever a slot
//! changes, and the outer binding reads `aggregate` one-way.
//!
//! Source paths starting with `.` or `*` are local to the object that owns
//! the outer binding. They are rewritten to `*localObject.<rest>` rooted at
//! the adapter, and the adapter's `localObject` is pointed at the outer
//! binding's to target once that resolves.

use std::fmt;
use std::rc::Rc;

use tether_core::{Endpoint, ObjectRef, PropertyAccess, Record, Value};

use super::binding::{Binding, BindingTemplate};

/// Aggregation over the current slot values, in path order.
pub type AggregateFn = Rc<dyn Fn(&[Value]) -> Value>;

pub(crate) const LOCAL_OBJECT_KEY: &str = "localObject";
pub(crate) const AGGREGATE_KEY: &str = "aggregate";

fn slot_key(index: usize) -> String {
    format!("value{index}")
}

/// What a template stores for a mix binding. Each instantiation builds its
/// own adapter from the recipe.
#[derive(Clone)]
pub struct MixRecipe {
    paths: Vec<String>,
    aggregate: AggregateFn,
}

impl MixRecipe {
    #[must_use]
    pub fn new<S: Into<String>>(
        paths: impl IntoIterator<Item = S>,
        aggregate: impl Fn(&[Value]) -> Value + 'static,
    ) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            aggregate: Rc::new(aggregate),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl fmt::Debug for MixRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixRecipe")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// Live adapter owned by one outer binding.
#[derive(Clone)]
pub(crate) struct MixAdapter {
    record: Rc<Record>,
    slots: Rc<[Binding]>,
}

impl MixAdapter {
    pub(crate) fn create(recipe: &MixRecipe) -> Self {
        let record = Record::shared();
        let count = recipe.len();

        for index in 0..count {
            let weak = Rc::downgrade(&record);
            let aggregate = Rc::clone(&recipe.aggregate);
            record.observe_key(
                &slot_key(index),
                Rc::new(move |_: &str| {
                    if let Some(record) = weak.upgrade() {
                        recompute(&record, count, &aggregate);
                    }
                }),
            );
        }
        recompute(&record, count, &recipe.aggregate);

        let root: ObjectRef = record.clone();
        let slots: Vec<Binding> = recipe
            .paths
            .iter()
            .enumerate()
            .map(|(index, path)| {
                BindingTemplate::new()
                    .from_endpoint(source_endpoint(&root, path))
                    .to_root(Rc::clone(&root), slot_key(index))
                    .one_way(true)
                    .instantiate()
            })
            .collect();

        Self {
            record,
            slots: Rc::from(slots),
        }
    }

    pub(crate) fn aggregate_endpoint(&self) -> Endpoint {
        Endpoint::rooted(self.record.clone(), AGGREGATE_KEY)
    }

    pub(crate) fn slots(&self) -> Vec<Binding> {
        self.slots.to_vec()
    }

    pub(crate) fn set_local_object(&self, target: &ObjectRef) {
        self.record
            .set(LOCAL_OBJECT_KEY, Value::Object(Rc::clone(target)));
    }

    pub(crate) fn destroy(&self) {
        for slot in self.slots.iter() {
            slot.destroy();
        }
    }
}

fn source_endpoint(adapter: &ObjectRef, path: &str) -> Endpoint {
    match path.strip_prefix('.').or_else(|| path.strip_prefix('*')) {
        Some(rest) => Endpoint::rooted(
            Rc::clone(adapter),
            format!("*{LOCAL_OBJECT_KEY}.{}", rest.replace('*', ".")),
        ),
        None => Endpoint::new(path),
    }
}

fn recompute(record: &Record, count: usize, aggregate: &AggregateFn) {
    let values: Vec<Value> = (0..count).map(|i| record.get(&slot_key(i))).collect();
    record.set(AGGREGATE_KEY, aggregate(&values));
}

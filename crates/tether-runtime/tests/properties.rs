//! Property tests for propagation guarantees.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use tether_core::{Endpoint, PropertyAccess, Record, Value};
use tether_runtime::reactive::{Binding, BindingTemplate, Scheduler, bind};

#[derive(Clone, Copy, Debug)]
enum Op {
    Add(i32),
    Mul(i32),
}

impl Op {
    fn apply(self, n: f64) -> f64 {
        match self {
            Self::Add(k) => n + f64::from(k),
            Self::Mul(k) => n * f64::from(k),
        }
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(-5i32..5).prop_map(Op::Add), (-3i32..4).prop_map(Op::Mul)]
}

proptest! {
    #[test]
    fn transforms_compose_left_to_right(start in -100i32..100, ops in prop::collection::vec(op(), 0..6)) {
        let scheduler = Scheduler::global();
        let source = Record::with_values([("v", start)]);
        let target = Record::shared();

        let mut template = bind(Endpoint::rooted(source.clone(), "v"))
            .to_root(target.clone(), "v")
            .one_way(true);
        for op in ops.iter().copied() {
            template = template.transform(move |v: Value, _: &Binding| {
                Value::Number(op.apply(v.as_number().unwrap_or(0.0)))
            });
        }
        let binding = scheduler.run(|| template.connect());

        let expected = ops.iter().fold(f64::from(start), |acc, op| op.apply(acc));
        prop_assert_eq!(target.get("v").as_number(), Some(expected));
        binding.destroy();
    }

    #[test]
    fn one_way_never_writes_back(writes in prop::collection::vec(-50i32..50, 1..8)) {
        let scheduler = Scheduler::global();
        let source = Record::with_values([("v", 1000)]);
        let target = Record::shared();
        let binding = scheduler.run(|| {
            BindingTemplate::new()
                .from_root(source.clone(), "v")
                .to_root(target.clone(), "v")
                .one_way(true)
                .connect()
        });

        for w in writes {
            scheduler.run(|| target.set("v", Value::from(w)));
            prop_assert_eq!(source.get("v").as_number(), Some(1000.0));
        }
        binding.destroy();
    }

    #[test]
    fn repeated_identical_writes_apply_once(value in -1000i32..1000, repeats in 1usize..10) {
        let scheduler = Scheduler::global();
        let source = Record::with_values([("v", i32::MIN)]);
        let target = Record::shared();
        let applied = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&applied);
        let binding = scheduler.run(|| {
            bind(Endpoint::rooted(source.clone(), "v"))
                .to_root(target.clone(), "v")
                .one_way(true)
                .connect()
        });
        let observer = target.observe_key("v", Rc::new(move |_: &str| counter.set(counter.get() + 1)));

        scheduler.run(|| {
            for _ in 0..repeats {
                source.set("v", Value::from(value));
            }
        });
        prop_assert_eq!(applied.get(), 1);
        prop_assert_eq!(target.get("v").as_number(), Some(f64::from(value)));

        if let Some(id) = observer {
            target.unobserve_key("v", id);
        }
        binding.destroy();
    }

    #[test]
    fn chains_reach_quiescence(len in 1usize..8, value in any::<i32>()) {
        let scheduler = Scheduler::global();
        let records: Vec<Rc<Record>> = (0..=len).map(|_| Record::shared()).collect();
        let bindings: Vec<Binding> = scheduler.run(|| {
            records
                .windows(2)
                .map(|pair| {
                    bind(Endpoint::rooted(pair[0].clone(), "v"))
                        .to_root(pair[1].clone(), "v")
                        .connect()
                })
                .collect()
        });

        scheduler.run(|| records[0].set("v", Value::from(value)));
        prop_assert_eq!(scheduler.pending_changes(), 0);
        prop_assert_eq!(scheduler.pending_connects(), 0);
        for record in &records {
            prop_assert_eq!(record.get("v").as_number(), Some(f64::from(value)));
        }

        // Two-way: a write at the far end travels back to the start.
        let last = records.len() - 1;
        scheduler.run(|| records[last].set("v", Value::from(value / 2 + 1)));
        prop_assert_eq!(
            records[0].get("v").as_number(),
            Some(f64::from(value / 2 + 1))
        );

        for binding in bindings {
            binding.destroy();
        }
    }
}

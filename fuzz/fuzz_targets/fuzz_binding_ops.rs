#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_core::{Endpoint, PropertyAccess, Record, Value};
use tether_runtime::reactive::{Binding, Scheduler, bind};

#[derive(Arbitrary, Debug)]
enum Op {
    WriteSource(i8),
    WriteTarget(i8),
    Disconnect(u8),
    Connect(u8),
    Destroy(u8),
    Flush,
}

fuzz_target!(|input: (bool, Vec<Op>)| {
    let (one_way, ops) = input;
    let scheduler = Scheduler::global();
    let source = Record::with_values([("v", 0)]);
    let targets: Vec<_> = (0..3).map(|_| Record::shared()).collect();
    let bindings: Vec<Binding> = targets
        .iter()
        .map(|t| {
            bind(Endpoint::rooted(source.clone(), "v"))
                .to_root(t.clone(), "v")
                .one_way(one_way)
                .connect()
        })
        .collect();

    for op in ops.into_iter().take(64) {
        match op {
            Op::WriteSource(n) => source.set("v", Value::from(i32::from(n))),
            Op::WriteTarget(n) => targets[0].set("v", Value::from(i32::from(n))),
            Op::Disconnect(i) => {
                bindings[usize::from(i) % 3].disconnect();
            }
            Op::Connect(i) => {
                bindings[usize::from(i) % 3].connect();
            }
            Op::Destroy(i) => bindings[usize::from(i) % 3].destroy(),
            Op::Flush => {
                scheduler.run_scheduled_tick();
            }
        }
    }
    scheduler.run(|| {});

    // A full tick always drains both queues.
    assert_eq!(scheduler.pending_changes(), 0);
    assert_eq!(scheduler.pending_connects(), 0);
    for binding in &bindings {
        binding.destroy();
    }
});

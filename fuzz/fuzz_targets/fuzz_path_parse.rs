#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_core::{Endpoint, PropertyAccess, PropertyPath, Record, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    // Lenient conversion never fails.
    let lenient = PropertyPath::from(raw);

    if let Ok(strict) = PropertyPath::parse(raw) {
        assert!(!strict.is_empty());
        assert_eq!(strict, lenient);

        let printed = strict.to_string();
        let reparsed = PropertyPath::parse(&printed).expect("printed path reparses");
        assert_eq!(strict, reparsed);
    }

    // Resolution against a small tree never panics and never yields an
    // empty key.
    let leaf = Record::with_values([("b", 1)]);
    let root = Record::with_values([("a", Value::Object(leaf))]);
    let endpoint = Endpoint::rooted(root, lenient);
    if let Some((_, key)) = endpoint.resolve(None) {
        assert!(!key.is_empty());
    }
});

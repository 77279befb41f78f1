#![no_main]

use libfuzzer_sys::fuzz_target;
use ltsvq_core::{parse_record, Delimiters};

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(record) = parse_record(line, Delimiters::default()) {
        // Keys are unique and non-empty, and every key resolves to a value
        assert!(!record.is_empty());
        for (key, value) in record.iter() {
            assert!(!key.is_empty());
            assert_eq!(record.get(key), Some(value));
        }
    }
});

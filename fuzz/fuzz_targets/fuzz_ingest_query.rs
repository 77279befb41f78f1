#![no_main]

use libfuzzer_sys::fuzz_target;
use ltsvq_core::{ingest, Delimiters, LtsvTable, OutputFormatter};

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let mut table = LtsvTable::new();
    if ingest(&mut table, data, Delimiters::default()).is_err() {
        return;
    }

    // SELECT * returns every committed row
    let rows = match table.query("SELECT * FROM ltsv") {
        Ok(rows) => rows,
        Err(e) => panic!("SELECT * failed: {}", e),
    };
    assert_eq!(rows.len(), table.len());

    let mut out = OutputFormatter::new(Vec::new());
    let _ = out.write_all(&rows);
    let _ = out.finish();
});

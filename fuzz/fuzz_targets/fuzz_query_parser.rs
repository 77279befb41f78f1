#![no_main]

use libfuzzer_sys::fuzz_target;
use ltsvq_core::query::{Parser, Planner};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string (ignore invalid UTF-8)
    if let Ok(sql) = std::str::from_utf8(data) {
        // Limit query length to prevent timeout
        if sql.len() > 10_000 {
            return;
        }

        // Parsing and planning must never panic
        if let Ok(mut parser) = Parser::new(sql) {
            if let Ok(query) = parser.parse() {
                // The printed form goes back through the parser too
                let printed = query.to_string();
                if let Ok(mut reparser) = Parser::new(&printed) {
                    let _ = reparser.parse();
                }
                let _ = Planner::new().plan(&query);
            }
        }
    }
});

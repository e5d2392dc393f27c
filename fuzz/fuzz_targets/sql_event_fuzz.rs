#![no_main]
//! Fuzz the SQL splitter and classifier.
//!
//! Neither may panic on any input, and every fragment the splitter returns
//! must be a non-empty slice of the script.

use libfuzzer_sys::fuzz_target;
use pg_cache_sync::sql::{split, try_classify};

fuzz_target!(|data: &[u8]| {
    let Ok(sql) = std::str::from_utf8(data) else {
        return;
    };

    for fragment in split(sql) {
        assert!(!fragment.is_empty());
        assert!(sql.contains(fragment));
        let _ = try_classify(fragment);
    }
});

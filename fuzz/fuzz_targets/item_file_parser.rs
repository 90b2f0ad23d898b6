#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use lamp::reader::parse_item_table;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed tables must come back as parse errors, never panics
        let _ = parse_item_table(input, Path::new("fuzz.csv"), ',');
        let _ = parse_item_table(input, Path::new("fuzz.tsv"), '\t');
    }
});

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use lamp::reader::parse_values;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_values(input, Path::new("fuzz.csv"), ',');
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use sheetcast::{read_from_bytes, ReadOptions};

// Arbitrary bytes must never panic the reader; errors are fine.
fuzz_target!(|data: &[u8]| {
    let _ = read_from_bytes(data, 0, ReadOptions::new());
    let _ = read_from_bytes(data, 0, ReadOptions::new().with_header(true).with_take_rows(64));
});

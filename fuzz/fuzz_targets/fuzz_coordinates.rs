#![no_main]

use libfuzzer_sys::fuzz_target;
use sheetcast::utils::{parse_coordinate_bytes, parse_f64_bytes, parse_u32_bytes};

fuzz_target!(|data: &[u8]| {
    if let Some((row, col)) = parse_coordinate_bytes(data) {
        assert!(row < sheetcast::utils::MAX_ROW);
        assert!(col < sheetcast::utils::MAX_COLUMN);
    }
    let _ = parse_u32_bytes(data);
    let _ = parse_f64_bytes(data);
});

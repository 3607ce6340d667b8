//! Fuzz target for Superb AI label file parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use waffle_hub::ir::io_superb_ai::fuzz_parse_label;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_label(data);
});

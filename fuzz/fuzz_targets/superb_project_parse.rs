//! Fuzz target for Superb AI `project.json` parsing and category
//! reconstruction.

#![no_main]

use libfuzzer_sys::fuzz_target;
use waffle_hub::ir::io_superb_ai::categories_from_project_slice;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(categories) = categories_from_project_slice(data) {
        // Ids are handed out densely from 1.
        for (idx, category) in categories.iter().enumerate() {
            assert_eq!(category.id.as_u64(), idx as u64 + 1);
        }
    }
});

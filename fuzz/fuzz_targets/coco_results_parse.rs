//! Fuzz target for COCO detection results, followed by the darknet id remap.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vocprep::ir::io_coco_json::from_coco_results_slice;
use vocprep::remap::CategoryIdMap;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(mut results) = from_coco_results_slice(data) {
        let _ = CategoryIdMap::darknet_coco().apply(&mut results);
    }
});

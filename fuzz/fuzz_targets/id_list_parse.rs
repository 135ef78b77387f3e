//! Fuzz target for sparse category id lists.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use vocprep::remap::{parse_id_list, CategoryIdMap};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(ids) = parse_id_list(text, Path::new("fuzz.txt")) {
        let map = CategoryIdMap::from_sparse(&ids);
        let _ = map.map(ids[0]);
    }
});

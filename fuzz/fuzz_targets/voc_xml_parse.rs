//! Fuzz target for VOC XML parsing and box extraction.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use vocprep::ir::io_voc_xml::from_voc_xml_slice;
use vocprep::ir::CategoryList;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(voc) = from_voc_xml_slice(data) {
        let categories = CategoryList::new(["cat", "dog", "person"]);
        let _ = voc.labeled_boxes(&categories, Path::new("fuzz.xml"));
    }
});

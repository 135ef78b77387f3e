use std::path::Path;

use proptest::prelude::*;
use vocprep::ir::io_voc_xml::parse_voc_xml_str;
use vocprep::ir::CategoryList;

mod common;
mod proptest_helpers;

const NAMES: [&str; 4] = ["cat", "Dog", "horse", "BIRD"];

fn arb_objects() -> impl Strategy<Value = Vec<(usize, bool, [f64; 4])>> {
    prop::collection::vec(
        (
            0usize..NAMES.len(),
            any::<bool>(),
            (0.0f64..500.0, 0.0f64..500.0, 1.0f64..100.0, 1.0f64..100.0),
        )
            .prop_map(|(name, difficult, (x, y, w, h))| (name, difficult, [x, y, x + w, y + h])),
        0..12,
    )
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn difficult_and_unlisted_objects_never_survive(objects in arb_objects()) {
        let test_objects: Vec<common::TestObject<'_>> = objects
            .iter()
            .map(|(name, difficult, bbox)| common::TestObject {
                name: NAMES[*name],
                difficult: *difficult,
                bbox: *bbox,
            })
            .collect();
        let xml = common::voc_xml(640, 480, &test_objects);

        let parsed = parse_voc_xml_str(&xml, Path::new("gen.xml")).expect("generated xml parses");
        let categories = CategoryList::new(["cat", "dog", "bird"]);
        let boxes = parsed.labeled_boxes(&categories, Path::new("gen.xml"));

        let expected: Vec<(usize, [f64; 4])> = objects
            .iter()
            .filter(|(_, difficult, _)| !difficult)
            .filter_map(|(name, _, bbox)| {
                categories
                    .index_of(&NAMES[*name].to_lowercase())
                    .map(|index| (index, *bbox))
            })
            .collect();

        prop_assert_eq!(boxes.len(), expected.len());
        for (labeled, (index, [x1, y1, x2, y2])) in boxes.iter().zip(expected) {
            prop_assert_eq!(labeled.class_index, index);
            prop_assert_eq!(labeled.bbox.xmin(), x1);
            prop_assert_eq!(labeled.bbox.ymin(), y1);
            prop_assert_eq!(labeled.bbox.xmax(), x2);
            prop_assert_eq!(labeled.bbox.ymax(), y2);
        }
    }
}

#![allow(dead_code)]

use std::path::PathBuf;

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use vocprep::ir::{BBoxXYXY, Pixel};
use vocprep::split::SplitPair;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Image dimensions as VOC files carry them.
pub fn arb_image_size() -> impl Strategy<Value = (u32, u32)> {
    (1u32..4096, 1u32..4096)
}

/// A well-formed box inside a `width` x `height` image.
pub fn arb_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBoxXYXY<Pixel>> {
    let w = width as f64;
    let h = height as f64;
    (0.0..w, 0.0..h, 0.0..w, 0.0..h)
        .prop_map(|(x1, y1, x2, y2)| {
            BBoxXYXY::from_xyxy(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
        })
        .boxed()
}

/// Image size plus a box inside it.
pub fn arb_sized_bbox() -> BoxedStrategy<((u32, u32), BBoxXYXY<Pixel>)> {
    arb_image_size()
        .prop_flat_map(|(w, h)| (Just((w, h)), arb_bbox_within(w, h)))
        .boxed()
}

/// Sparse id table without duplicates, in generation order.
pub fn arb_sparse_ids(max_len: usize) -> BoxedStrategy<Vec<u64>> {
    prop::collection::btree_set(1u64..1000, 1..max_len)
        .prop_flat_map(|set| Just(set.into_iter().collect::<Vec<_>>()).prop_shuffle())
        .boxed()
}

pub fn pairs(category: &str, n: usize) -> Vec<SplitPair> {
    (0..n)
        .map(|i| SplitPair {
            category: category.to_string(),
            xml_path: PathBuf::from(format!("/data/{category}/{category}_{i}.xml")),
            image_path: PathBuf::from(format!("/data/{category}/{category}_{i}.jpg")),
        })
        .collect()
}

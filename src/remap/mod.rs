//! Category id remapping for detector output.
//!
//! Darknet reports COCO detections with the sparse 91-id COCO category
//! space; ground truth built by vocprep uses dense 1-based ids. The map sends
//! each sparse id to its 1-based position in the sparse table.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VocprepError;
use crate::ir::io_coco_json::{read_coco_results, write_coco_results, CocoResult};
use crate::ir::path_list::sibling_with_suffix;

/// The `coco_ids` table darknet uses for its 80 COCO classes.
pub const DARKNET_COCO_IDS: [u64; 80] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 27, 28,
    31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 46, 47, 48, 49, 50, 51, 52, 53, 54, 55,
    56, 57, 58, 59, 60, 61, 62, 63, 64, 65, 67, 70, 72, 73, 74, 75, 76, 77, 78, 79, 80, 81, 82, 84,
    85, 86, 87, 88, 89, 90,
];

/// Sparse id -> dense 1-based id.
#[derive(Clone, Debug)]
pub struct CategoryIdMap {
    dense: HashMap<u64, u64>,
}

impl CategoryIdMap {
    /// Maps `sparse[i]` to `i + 1`. On duplicate entries the first position
    /// wins.
    pub fn from_sparse(sparse: &[u64]) -> Self {
        let mut dense = HashMap::with_capacity(sparse.len());
        for (index, id) in sparse.iter().enumerate() {
            dense.entry(*id).or_insert(index as u64 + 1);
        }
        Self { dense }
    }

    pub fn darknet_coco() -> Self {
        Self::from_sparse(&DARKNET_COCO_IDS)
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Dense id for `id`; an id outside the table is an error.
    pub fn map(&self, id: u64) -> Result<u64, VocprepError> {
        self.dense
            .get(&id)
            .copied()
            .ok_or(VocprepError::UnknownCategoryId {
                id,
                table_len: self.dense.len(),
            })
    }

    /// Rewrites every `category_id` in place. On error nothing is modified.
    pub fn apply(&self, results: &mut [CocoResult]) -> Result<(), VocprepError> {
        let mapped = results
            .iter()
            .map(|result| self.map(result.category_id))
            .collect::<Result<Vec<_>, _>>()?;

        for (result, id) in results.iter_mut().zip(mapped) {
            result.category_id = id;
        }
        Ok(())
    }
}

/// Reads a sparse id table: one integer per line, blank lines skipped.
pub fn read_id_list(path: &Path) -> Result<Vec<u64>, VocprepError> {
    if !path.is_file() {
        return Err(VocprepError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    parse_id_list(&content, path)
}

/// Parses id-list text; `path` only labels errors.
pub fn parse_id_list(content: &str, path: &Path) -> Result<Vec<u64>, VocprepError> {
    let mut ids = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id = line.parse::<u64>().map_err(|err| VocprepError::IdListParse {
            path: path.to_path_buf(),
            line: index + 1,
            message: format!("'{line}' is not a category id: {err}"),
        })?;
        ids.push(id);
    }

    if ids.is_empty() {
        return Err(VocprepError::IdListParse {
            path: path.to_path_buf(),
            line: 0,
            message: "the id list is empty".to_string(),
        });
    }

    Ok(ids)
}

/// `results.json` -> `results_fixed.json`, in the same directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    sibling_with_suffix(input, "_fixed")
}

/// Reads detections, remaps their category ids and writes them out.
/// Returns the number of rewritten detections.
pub fn run_remap(
    input: &Path,
    output: &Path,
    map: &CategoryIdMap,
) -> Result<usize, VocprepError> {
    if !input.is_file() {
        return Err(VocprepError::MissingFile {
            path: input.to_path_buf(),
        });
    }

    let mut results = read_coco_results(input)?;
    map.apply(&mut results)?;
    write_coco_results(output, &results)?;

    log::info!(
        "remapped {} detections from {} to {}",
        results.len(),
        input.display(),
        output.display()
    );
    Ok(results.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(category_id: u64) -> CocoResult {
        CocoResult {
            image_id: 1,
            category_id,
            bbox: Some([0.0, 0.0, 1.0, 1.0]),
            score: Some(0.9),
            extra: Default::default(),
        }
    }

    #[test]
    fn darknet_table_maps_to_positions() {
        let map = CategoryIdMap::darknet_coco();
        assert_eq!(map.len(), 80);
        assert_eq!(map.map(1).unwrap(), 1);
        assert_eq!(map.map(13).unwrap(), 12);
        assert_eq!(map.map(90).unwrap(), 80);
    }

    #[test]
    fn unknown_id_fails_without_touching_results() {
        let map = CategoryIdMap::darknet_coco();
        let mut results = vec![result(13), result(12)];

        let err = map.apply(&mut results).unwrap_err();
        assert!(matches!(
            err,
            VocprepError::UnknownCategoryId {
                id: 12,
                table_len: 80
            }
        ));
        assert_eq!(results[0].category_id, 13);
    }

    #[test]
    fn id_list_reports_bad_line() {
        let err = parse_id_list("1\n\n3\nfour\n", Path::new("ids.txt")).unwrap_err();
        assert!(matches!(err, VocprepError::IdListParse { line: 4, .. }));

        let ids = parse_id_list(" 5 \n7\n", Path::new("ids.txt")).unwrap();
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn run_remap_writes_fixed_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let input = temp.path().join("results.json");
        fs::write(
            &input,
            r#"[{"image_id": 3, "category_id": 90, "bbox": [1, 2, 3, 4], "score": 0.75}]"#,
        )
        .unwrap();

        let output = default_output_path(&input);
        assert_eq!(output, temp.path().join("results_fixed.json"));

        let count = run_remap(&input, &output, &CategoryIdMap::darknet_coco()).expect("remap");
        assert_eq!(count, 1);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written[0]["category_id"], 80);
        assert_eq!(written[0]["score"], 0.75);
    }

    #[test]
    fn failed_remap_writes_nothing() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let input = temp.path().join("results.json");
        fs::write(&input, r#"[{"image_id": 3, "category_id": 91}]"#).unwrap();
        let output = default_output_path(&input);

        assert!(run_remap(&input, &output, &CategoryIdMap::darknet_coco()).is_err());
        assert!(!output.exists());
    }
}

//! COCO bbox evaluation.
//!
//! Reproduces the reference COCO evaluation protocol for bounding boxes:
//!
//! - IoU thresholds 0.50:0.05:0.95 and 101 recall thresholds;
//! - area ranges all, small (< 32²), medium (32²..96²) and large (> 96²);
//! - 1, 10 and 100 detections per image;
//! - greedy matching in descending score order, where crowd boxes can absorb
//!   any number of detections and ignored ground truth never counts as a
//!   miss;
//! - interpolated precision (monotone envelope) sampled at each recall
//!   threshold.
//!
//! Evaluation runs in three passes as in the reference tool: per-image
//! matching, accumulation into precision/recall tables, and a twelve-number
//! summary.

pub mod report;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::VocprepError;
use crate::ir::io_coco_json::{read_coco_json, read_coco_results, CocoResult};
use crate::ir::{BBoxXYXY, Dataset, Pixel};

pub use report::{EvalSummary, Metric, SummaryStat};

/// An area range with its summary label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaRange {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

impl AreaRange {
    fn excludes(&self, area: f64) -> bool {
        area < self.min || area > self.max
    }
}

/// Evaluation parameters. [`EvalParams::coco`] gives the standard setup
/// that [`summarize`] expects.
#[derive(Clone, Debug)]
pub struct EvalParams {
    pub iou_thresholds: Vec<f64>,
    pub recall_thresholds: Vec<f64>,
    pub area_ranges: Vec<AreaRange>,
    /// Ascending; the last entry bounds per-image matching.
    pub max_dets: Vec<usize>,
}

impl EvalParams {
    pub fn coco() -> Self {
        Self {
            iou_thresholds: linspace(0.5, 0.95, 10),
            recall_thresholds: linspace(0.0, 1.0, 101),
            area_ranges: vec![
                AreaRange {
                    label: "all",
                    min: 0.0,
                    max: 1e10,
                },
                AreaRange {
                    label: "small",
                    min: 0.0,
                    max: 32.0 * 32.0,
                },
                AreaRange {
                    label: "medium",
                    min: 32.0 * 32.0,
                    max: 96.0 * 96.0,
                },
                AreaRange {
                    label: "large",
                    min: 96.0 * 96.0,
                    max: 1e10,
                },
            ],
            max_dets: vec![1, 10, 100],
        }
    }
}

impl Default for EvalParams {
    fn default() -> Self {
        Self::coco()
    }
}

/// `num` evenly spaced values from `start` to `stop` inclusive, computed as
/// `start + i * step` with the last value pinned to `stop`.
fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    if num < 2 {
        return vec![start; num];
    }
    let step = (stop - start) / (num - 1) as f64;
    let mut values: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
    values[num - 1] = stop;
    values
}

#[derive(Clone, Copy, Debug)]
struct GtBox {
    bbox: BBoxXYXY<Pixel>,
    area: f64,
    iscrowd: bool,
}

#[derive(Clone, Copy, Debug)]
struct DtBox {
    bbox: BBoxXYXY<Pixel>,
    area: f64,
    score: f64,
}

/// IoU as the reference tool computes it for boxes: for a crowd ground
/// truth the union is replaced by the detection area.
fn box_iou(dt: &BBoxXYXY<Pixel>, gt: &BBoxXYXY<Pixel>, crowd: bool) -> f64 {
    let inter = dt.intersection(gt);
    if inter <= 0.0 {
        return 0.0;
    }
    let union = if crowd {
        dt.area()
    } else {
        dt.area() + gt.area() - inter
    };
    inter / union
}

/// Matching outcome for one (image, category, area range).
#[derive(Clone, Debug)]
struct ImageEval {
    /// Detection scores, descending, truncated to the max detection count.
    dt_scores: Vec<f64>,
    /// `[threshold][detection]`
    dt_matched: Vec<Vec<bool>>,
    /// `[threshold][detection]`
    dt_ignored: Vec<Vec<bool>>,
    gt_ignored: Vec<bool>,
}

fn evaluate_image(
    gts: &[GtBox],
    dts: &[DtBox],
    area: &AreaRange,
    max_det: usize,
    iou_thresholds: &[f64],
) -> Option<ImageEval> {
    if gts.is_empty() && dts.is_empty() {
        return None;
    }

    // Non-ignored ground truth first; stable so file order breaks ties.
    let mut gt_order: Vec<usize> = (0..gts.len()).collect();
    gt_order.sort_by_key(|&g| gts[g].iscrowd || area.excludes(gts[g].area));
    let gts: Vec<GtBox> = gt_order.iter().map(|&g| gts[g]).collect();
    let gt_ignored: Vec<bool> = gts
        .iter()
        .map(|gt| gt.iscrowd || area.excludes(gt.area))
        .collect();

    let mut dt_order: Vec<usize> = (0..dts.len()).collect();
    dt_order.sort_by(|&a, &b| dts[b].score.total_cmp(&dts[a].score));
    dt_order.truncate(max_det);
    let dts: Vec<DtBox> = dt_order.iter().map(|&d| dts[d]).collect();

    let ious: Vec<Vec<f64>> = dts
        .iter()
        .map(|dt| {
            gts.iter()
                .map(|gt| box_iou(&dt.bbox, &gt.bbox, gt.iscrowd))
                .collect()
        })
        .collect();

    let num_t = iou_thresholds.len();
    let mut gt_matched = vec![vec![false; gts.len()]; num_t];
    let mut dt_matched = vec![vec![false; dts.len()]; num_t];
    let mut dt_ignored = vec![vec![false; dts.len()]; num_t];

    for (t, &threshold) in iou_thresholds.iter().enumerate() {
        for d in 0..dts.len() {
            let mut best = threshold.min(1.0 - 1e-10);
            let mut matched: Option<usize> = None;

            for g in 0..gts.len() {
                if gt_matched[t][g] && !gts[g].iscrowd {
                    continue;
                }
                // Once matched to a regular box, stop at the ignored tail.
                if let Some(m) = matched {
                    if !gt_ignored[m] && gt_ignored[g] {
                        break;
                    }
                }
                if ious[d][g] < best {
                    continue;
                }
                best = ious[d][g];
                matched = Some(g);
            }

            if let Some(g) = matched {
                dt_ignored[t][d] = gt_ignored[g];
                dt_matched[t][d] = true;
                gt_matched[t][g] = true;
            }
        }

        for (d, dt) in dts.iter().enumerate() {
            if !dt_matched[t][d] && area.excludes(dt.area) {
                dt_ignored[t][d] = true;
            }
        }
    }

    Some(ImageEval {
        dt_scores: dts.iter().map(|dt| dt.score).collect(),
        dt_matched,
        dt_ignored,
        gt_ignored,
    })
}

/// Precision and recall tables.
///
/// Cells with no ground truth to evaluate hold `-1.0`.
#[derive(Clone, Debug)]
pub struct Accumulated {
    num_t: usize,
    num_r: usize,
    num_k: usize,
    num_a: usize,
    num_m: usize,
    /// `[t][r][k][a][m]`
    precision: Vec<f64>,
    /// `[t][k][a][m]`
    recall: Vec<f64>,
}

impl Accumulated {
    fn new(num_t: usize, num_r: usize, num_k: usize, num_a: usize, num_m: usize) -> Self {
        Self {
            num_t,
            num_r,
            num_k,
            num_a,
            num_m,
            precision: vec![-1.0; num_t * num_r * num_k * num_a * num_m],
            recall: vec![-1.0; num_t * num_k * num_a * num_m],
        }
    }

    fn precision_index(&self, t: usize, r: usize, k: usize, a: usize, m: usize) -> usize {
        (((t * self.num_r + r) * self.num_k + k) * self.num_a + a) * self.num_m + m
    }

    fn recall_index(&self, t: usize, k: usize, a: usize, m: usize) -> usize {
        ((t * self.num_k + k) * self.num_a + a) * self.num_m + m
    }

    pub fn precision(&self, t: usize, r: usize, k: usize, a: usize, m: usize) -> f64 {
        self.precision[self.precision_index(t, r, k, a, m)]
    }

    pub fn recall(&self, t: usize, k: usize, a: usize, m: usize) -> f64 {
        self.recall[self.recall_index(t, k, a, m)]
    }
}

/// Ground truth and detections grouped by (image index, category index).
struct Grouped {
    image_ids: Vec<u64>,
    category_ids: Vec<u64>,
    gts: BTreeMap<(usize, usize), Vec<GtBox>>,
    dts: BTreeMap<(usize, usize), Vec<DtBox>>,
    gt_count: usize,
    dt_count: usize,
}

fn group_boxes(ground_truth: &Dataset, results: &[CocoResult]) -> Result<Grouped, VocprepError> {
    let image_ids: Vec<u64> = ground_truth
        .images
        .iter()
        .map(|img| img.id.as_u64())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let category_ids: Vec<u64> = ground_truth
        .categories
        .iter()
        .map(|cat| cat.id.as_u64())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let image_index: BTreeMap<u64, usize> =
        image_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let category_index: BTreeMap<u64, usize> = category_ids
        .iter()
        .enumerate()
        .map(|(k, id)| (*id, k))
        .collect();

    let unknown_images: BTreeSet<u64> = results
        .iter()
        .map(|result| result.image_id)
        .filter(|id| !image_index.contains_key(id))
        .collect();
    if !unknown_images.is_empty() {
        let listed: Vec<String> = unknown_images.iter().take(5).map(u64::to_string).collect();
        return Err(VocprepError::EvaluationFailed {
            message: format!(
                "results do not correspond to the ground truth: {} image id(s) not in the annotations (e.g. {})",
                unknown_images.len(),
                listed.join(", ")
            ),
        });
    }

    let mut grouped = Grouped {
        image_ids,
        category_ids,
        gts: BTreeMap::new(),
        dts: BTreeMap::new(),
        gt_count: 0,
        dt_count: 0,
    };

    for ann in &ground_truth.annotations {
        let (Some(&i), Some(&k)) = (
            image_index.get(&ann.image_id.as_u64()),
            category_index.get(&ann.category_id.as_u64()),
        ) else {
            continue;
        };
        grouped.gts.entry((i, k)).or_default().push(GtBox {
            bbox: ann.bbox,
            area: ann.effective_area(),
            iscrowd: ann.iscrowd,
        });
        grouped.gt_count += 1;
    }

    let mut foreign_categories = 0usize;
    for (position, result) in results.iter().enumerate() {
        let (Some([x, y, w, h]), Some(score)) = (result.bbox, result.score) else {
            return Err(VocprepError::EvaluationFailed {
                message: format!(
                    "detection #{} (image {}) has no bbox or score",
                    position + 1,
                    result.image_id
                ),
            });
        };

        let Some(&k) = category_index.get(&result.category_id) else {
            foreign_categories += 1;
            continue;
        };
        let i = image_index[&result.image_id];

        grouped.dts.entry((i, k)).or_default().push(DtBox {
            bbox: BBoxXYXY::from_xywh(x, y, w, h),
            area: w * h,
            score,
        });
        grouped.dt_count += 1;
    }

    if foreign_categories > 0 {
        log::warn!(
            "{foreign_categories} detection(s) use category ids absent from the ground truth and were ignored"
        );
    }

    Ok(grouped)
}

/// Runs per-image matching and accumulation.
pub fn evaluate_bbox(
    ground_truth: &Dataset,
    results: &[CocoResult],
    params: &EvalParams,
) -> Result<(Accumulated, EvalSummary), VocprepError> {
    let grouped = group_boxes(ground_truth, results)?;
    let max_det = params.max_dets.last().copied().unwrap_or(0);

    let num_i = grouped.image_ids.len();
    let num_k = grouped.category_ids.len();
    let num_a = params.area_ranges.len();

    // [k][a][i]
    let mut evals: Vec<Option<ImageEval>> = Vec::with_capacity(num_k * num_a * num_i);
    for k in 0..num_k {
        for area in &params.area_ranges {
            for i in 0..num_i {
                let gts = grouped.gts.get(&(i, k)).map(Vec::as_slice).unwrap_or(&[]);
                let dts = grouped.dts.get(&(i, k)).map(Vec::as_slice).unwrap_or(&[]);
                evals.push(evaluate_image(
                    gts,
                    dts,
                    area,
                    max_det,
                    &params.iou_thresholds,
                ));
            }
        }
    }

    let accumulated = accumulate(&evals, num_i, num_k, params);
    let summary = EvalSummary {
        images: num_i,
        categories: num_k,
        ground_truth_boxes: grouped.gt_count,
        detections: grouped.dt_count,
        stats: summarize(&accumulated, params),
    };

    Ok((accumulated, summary))
}

fn accumulate(
    evals: &[Option<ImageEval>],
    num_i: usize,
    num_k: usize,
    params: &EvalParams,
) -> Accumulated {
    let num_t = params.iou_thresholds.len();
    let num_r = params.recall_thresholds.len();
    let num_a = params.area_ranges.len();
    let num_m = params.max_dets.len();
    let mut acc = Accumulated::new(num_t, num_r, num_k, num_a, num_m);

    for k in 0..num_k {
        for a in 0..num_a {
            let offset = (k * num_a + a) * num_i;
            let image_evals: Vec<&ImageEval> = evals[offset..offset + num_i]
                .iter()
                .flatten()
                .collect();
            if image_evals.is_empty() {
                continue;
            }

            let num_positive: usize = image_evals
                .iter()
                .map(|e| e.gt_ignored.iter().filter(|ignored| !**ignored).count())
                .sum();
            if num_positive == 0 {
                continue;
            }

            for (m, &max_det) in params.max_dets.iter().enumerate() {
                // (image eval, detection) in descending score order; stable so
                // equal scores keep image order.
                let mut dets: Vec<(usize, usize)> = image_evals
                    .iter()
                    .enumerate()
                    .flat_map(|(e, eval)| {
                        (0..eval.dt_scores.len().min(max_det)).map(move |d| (e, d))
                    })
                    .collect();
                dets.sort_by(|&(ea, da), &(eb, db)| {
                    image_evals[eb].dt_scores[db].total_cmp(&image_evals[ea].dt_scores[da])
                });

                for t in 0..num_t {
                    let (recalls, precisions) =
                        precision_recall_curve(&image_evals, &dets, t, num_positive);

                    let r_idx = acc.recall_index(t, k, a, m);
                    acc.recall[r_idx] = recalls.last().copied().unwrap_or(0.0);

                    let sampled =
                        sample_precision(&recalls, precisions, &params.recall_thresholds);
                    for (r, value) in sampled.into_iter().enumerate() {
                        let p_idx = acc.precision_index(t, r, k, a, m);
                        acc.precision[p_idx] = value;
                    }
                }
            }
        }
    }

    acc
}

/// Cumulative recall and precision after each detection. Ignored detections
/// contribute neither a true nor a false positive but still occupy a slot.
fn precision_recall_curve(
    image_evals: &[&ImageEval],
    dets: &[(usize, usize)],
    t: usize,
    num_positive: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut recalls = Vec::with_capacity(dets.len());
    let mut precisions = Vec::with_capacity(dets.len());

    for &(e, d) in dets {
        let eval = image_evals[e];
        if !eval.dt_ignored[t][d] {
            if eval.dt_matched[t][d] {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
        }
        recalls.push(tp / num_positive as f64);
        precisions.push(tp / (tp + fp + f64::EPSILON));
    }

    (recalls, precisions)
}

/// Applies the monotone precision envelope and reads precision at each
/// recall threshold (first index with recall >= threshold). Thresholds
/// beyond the reached recall read as zero.
fn sample_precision(recalls: &[f64], mut precisions: Vec<f64>, thresholds: &[f64]) -> Vec<f64> {
    for i in (1..precisions.len()).rev() {
        if precisions[i] > precisions[i - 1] {
            precisions[i - 1] = precisions[i];
        }
    }

    let mut sampled = vec![0.0; thresholds.len()];
    for (r, &threshold) in thresholds.iter().enumerate() {
        let index = recalls.partition_point(|&recall| recall < threshold);
        if index >= precisions.len() {
            break;
        }
        sampled[r] = precisions[index];
    }
    sampled
}

fn mean_of_valid(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|value| *value > -1.0)
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        -1.0
    } else {
        sum / count as f64
    }
}

/// The twelve standard statistics.
pub fn summarize(acc: &Accumulated, params: &EvalParams) -> Vec<SummaryStat> {
    let specs: [(Metric, Option<f64>, &str, usize); 12] = [
        (Metric::AveragePrecision, None, "all", 100),
        (Metric::AveragePrecision, Some(0.5), "all", 100),
        (Metric::AveragePrecision, Some(0.75), "all", 100),
        (Metric::AveragePrecision, None, "small", 100),
        (Metric::AveragePrecision, None, "medium", 100),
        (Metric::AveragePrecision, None, "large", 100),
        (Metric::AverageRecall, None, "all", 1),
        (Metric::AverageRecall, None, "all", 10),
        (Metric::AverageRecall, None, "all", 100),
        (Metric::AverageRecall, None, "small", 100),
        (Metric::AverageRecall, None, "medium", 100),
        (Metric::AverageRecall, None, "large", 100),
    ];

    let iou_range = match (params.iou_thresholds.first(), params.iou_thresholds.last()) {
        (Some(lo), Some(hi)) => format!("{lo:.2}:{hi:.2}"),
        _ => String::new(),
    };

    specs
        .iter()
        .map(|&(metric, iou, area_label, max_det)| {
            let value = summary_value(acc, params, metric, iou, area_label, max_det);
            SummaryStat {
                metric,
                iou: iou.map_or_else(|| iou_range.clone(), |iou| format!("{iou:.2}")),
                area: area_label.to_string(),
                max_dets: max_det,
                value,
            }
        })
        .collect()
}

fn summary_value(
    acc: &Accumulated,
    params: &EvalParams,
    metric: Metric,
    iou: Option<f64>,
    area_label: &str,
    max_det: usize,
) -> f64 {
    let area = params.area_ranges.iter().position(|a| a.label == area_label);
    let m = params.max_dets.iter().position(|&d| d == max_det);
    let (Some(a), Some(m)) = (area, m) else {
        return -1.0;
    };

    let thresholds: Vec<usize> = match iou {
        None => (0..acc.num_t).collect(),
        Some(iou) => params
            .iou_thresholds
            .iter()
            .position(|t| (t - iou).abs() < 1e-9)
            .into_iter()
            .collect(),
    };

    match metric {
        Metric::AveragePrecision => mean_of_valid(thresholds.iter().flat_map(|&t| {
            (0..acc.num_r).flat_map(move |r| {
                (0..acc.num_k).map(move |k| acc.precision(t, r, k, a, m))
            })
        })),
        Metric::AverageRecall => mean_of_valid(
            thresholds
                .iter()
                .flat_map(|&t| (0..acc.num_k).map(move |k| acc.recall(t, k, a, m))),
        ),
    }
}

/// Loads both files and evaluates.
pub fn run_evaluation(
    annotations: &Path,
    results: &Path,
) -> Result<EvalSummary, VocprepError> {
    for path in [annotations, results] {
        if !path.is_file() {
            return Err(VocprepError::MissingFile {
                path: path.to_path_buf(),
            });
        }
    }

    let ground_truth = read_coco_json(annotations)?;
    let detections = read_coco_results(results)?;
    log::info!(
        "loaded {} ground-truth annotations and {} detections",
        ground_truth.annotations.len(),
        detections.len()
    );

    let (_, summary) = evaluate_bbox(&ground_truth, &detections, &EvalParams::coco())?;
    Ok(summary)
}

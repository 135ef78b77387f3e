//! Evaluation summary types and the COCO-style text rendering.

use serde::Serialize;
use std::fmt;

/// Average precision or average recall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Metric {
    #[serde(rename = "AP")]
    AveragePrecision,
    #[serde(rename = "AR")]
    AverageRecall,
}

impl Metric {
    fn title(self) -> &'static str {
        match self {
            Metric::AveragePrecision => "Average Precision",
            Metric::AverageRecall => "Average Recall",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Metric::AveragePrecision => "(AP)",
            Metric::AverageRecall => "(AR)",
        }
    }
}

/// One line of the summary.
#[derive(Clone, Debug, Serialize)]
pub struct SummaryStat {
    pub metric: Metric,
    /// `"0.50:0.95"` for the averaged range or a single threshold such as
    /// `"0.50"`.
    pub iou: String,
    pub area: String,
    pub max_dets: usize,
    /// Mean over the selected cells; `-1.0` when there was nothing to
    /// average.
    pub value: f64,
}

impl fmt::Display for SummaryStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " {:<18} {} @[ IoU={:<9} | area={:>6} | maxDets={:>3} ] = {:.3}",
            self.metric.title(),
            self.metric.tag(),
            self.iou,
            self.area,
            self.max_dets,
            self.value
        )
    }
}

/// The result of a bbox evaluation run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct EvalSummary {
    pub images: usize,
    pub categories: usize,
    pub ground_truth_boxes: usize,
    pub detections: usize,
    /// The twelve standard statistics, in COCO order.
    pub stats: Vec<SummaryStat>,
}

impl EvalSummary {
    /// AP averaged over IoU 0.50:0.95, all areas, 100 detections.
    pub fn map(&self) -> Option<f64> {
        self.stats.first().map(|stat| stat.value)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for EvalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Evaluated {} detections against {} ground-truth boxes ({} images, {} categories)",
            self.detections, self.ground_truth_boxes, self.images, self.categories
        )?;
        for stat in &self.stats {
            writeln!(f, "{stat}")?;
        }
        Ok(())
    }
}

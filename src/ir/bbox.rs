//! Bounding box types and the conversions between VOC, COCO and YOLO layouts.

use std::fmt;
use std::marker::PhantomData;

use super::space::{Normalized, Pixel};

/// Pixel offset subtracted from a box center before it is normalized for YOLO.
///
/// Carried over from the darknet `voc_label` convention, which treats VOC
/// coordinates as 1-based.
pub const YOLO_CENTER_OFFSET: f64 = 1.0;

/// An axis-aligned bounding box in corner format (xmin, ymin, xmax, ymax).
///
/// The constructor does not check that min < max. Boxes are passed through
/// as the annotation tool wrote them.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    /// Builds a box from COCO's `[x, y, width, height]` layout.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// May be negative for an inverted box.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// May be negative for an inverted box.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns the box as COCO `[x, y, width, height]`.
    #[inline]
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.width(), self.height()]
    }

    /// Degenerate polygon tracing the box corners, as COCO segmentation
    /// expects: `[x1, y1, x1, y2, x2, y2, x2, y1]`.
    pub fn to_polygon(&self) -> [f64; 8] {
        [
            self.xmin, self.ymin, self.xmin, self.ymax, self.xmax, self.ymax, self.xmax,
            self.ymin,
        ]
    }

    /// Area of the overlap between two boxes, zero when they are disjoint.
    pub fn intersection(&self, other: &Self) -> f64 {
        let w = self.xmax.min(other.xmax) - self.xmin.max(other.xmin);
        let h = self.ymax.min(other.ymax) - self.ymin.max(other.ymin);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Intersection over union.
    pub fn iou(&self, other: &Self) -> f64 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

impl BBoxXYXY<Pixel> {
    /// Converts to YOLO's normalized center format.
    ///
    /// `cx = (xmin + xmax) / 2 - 1` and `cy = (ymin + ymax) / 2 - 1` before
    /// dividing by the image size. Results are not clamped; callers must
    /// reject non-positive image dimensions first.
    pub fn to_yolo(&self, image_width: f64, image_height: f64) -> BBoxCxCyWh<Normalized> {
        let cx = (self.xmin + self.xmax) / 2.0 - YOLO_CENTER_OFFSET;
        let cy = (self.ymin + self.ymax) / 2.0 - YOLO_CENTER_OFFSET;

        BBoxCxCyWh::new(
            cx / image_width,
            cy / image_height,
            self.width() / image_width,
            self.height() / image_height,
        )
    }

    /// Inverse of [`BBoxXYXY::to_yolo`].
    pub fn from_yolo(yolo: &BBoxCxCyWh<Normalized>, image_width: f64, image_height: f64) -> Self {
        let cx = yolo.cx * image_width + YOLO_CENTER_OFFSET;
        let cy = yolo.cy * image_height + YOLO_CENTER_OFFSET;
        let half_w = yolo.w * image_width / 2.0;
        let half_h = yolo.h * image_height / 2.0;

        Self::from_xyxy(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }
}

impl<TSpace> fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYXY<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

/// A box in center format (cx, cy, w, h).
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxCxCyWh<TSpace> {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxCxCyWh<TSpace> {
    #[inline]
    pub fn new(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            cx,
            cy,
            w,
            h,
            _space: PhantomData,
        }
    }
}

impl<TSpace> fmt::Debug for BBoxCxCyWh<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BBoxCxCyWh")
            .field("cx", &self.cx)
            .field("cy", &self.cy)
            .field("w", &self.w)
            .field("h", &self.h)
            .finish()
    }
}

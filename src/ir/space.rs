//! Coordinate space markers.
//!
//! Boxes carry their space as a type parameter so that pixel boxes read from
//! VOC XML cannot be handed to code expecting YOLO's normalized values.

/// Absolute pixel coordinates, origin at the top-left corner of the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pixel;

/// Coordinates divided by the image width/height.
///
/// Values are expected in `[0, 1]` but nothing clamps them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Normalized;

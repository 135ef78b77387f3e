//! Shared data model and file formats.
//!
//! Everything the subcommands read or write passes through this module:
//! VOC XML annotations, COCO JSON datasets and detection results, YOLO label
//! files, category lists and newline-delimited path manifests.
//!
//! Boxes are held in pixel-space XYXY ([`BBoxXYXY<Pixel>`]) and only
//! converted to COCO's XYWH or YOLO's normalized center layout at the edges.
//! Marker types keep pixel and normalized coordinates apart at compile time.
//!
//! # Example
//!
//! ```
//! use vocprep::ir::{BBoxXYXY, Pixel};
//!
//! let bbox = BBoxXYXY::<Pixel>::from_xyxy(10.0, 20.0, 50.0, 60.0);
//! assert_eq!(bbox.to_xywh(), [10.0, 20.0, 40.0, 40.0]);
//!
//! let yolo = bbox.to_yolo(100.0, 100.0);
//! assert!((yolo.cx - 0.29).abs() < 1e-9);
//! ```

mod bbox;
mod categories;
mod ids;
pub mod io_coco_json;
pub mod io_voc_xml;
pub mod io_yolo;
mod model;
pub mod path_list;
mod space;

pub use bbox::{BBoxCxCyWh, BBoxXYXY, YOLO_CENTER_OFFSET};
pub use categories::CategoryList;
pub use ids::{AnnotationId, CategoryId, ImageId, LicenseId};
pub use model::{Annotation, Category, Dataset, DatasetInfo, Image, License};
pub use space::{Normalized, Pixel};

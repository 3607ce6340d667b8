//! Intermediate representation (IR) and on-disk adapters.
//!
//! The IR is a Waffle dataset held in memory. Adapters translate between it
//! and directory layouts:
//!
//! - [`io_waffle`]: the native Waffle dataset directory (`info.yaml`, one
//!   JSON file per record, `raw/` images).
//! - [`io_superb_ai`]: the Superb AI labeling-platform export
//!   (`project.json`, `meta/`, `labels/`).
//!
//! # Example
//!
//! ```
//! use waffle_hub::ir::{Annotation, BBoxXYXY, Category, Dataset, Image};
//!
//! let dataset = Dataset {
//!     images: vec![Image::new(1u64, "image.jpg", 640, 480)],
//!     categories: vec![Category::with_supercategory(1u64, "sedan", "car")],
//!     annotations: vec![Annotation::new(
//!         1u64,
//!         1u64,
//!         1u64,
//!         BBoxXYXY::from_xywh(10.0, 20.0, 90.0, 180.0),
//!     )],
//!     ..Default::default()
//! };
//! assert_eq!(dataset.categories[0].supercategory, "car");
//! ```

mod bbox;
mod coord;
mod ids;
pub(crate) mod io_util;
pub mod io_superb_ai;
pub mod io_waffle;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use ids::{AnnotationId, CategoryId, IdCounter, ImageId};
pub use model::{
    Annotation, Category, Dataset, DatasetInfo, Image, TaskType, DEFAULT_SUPERCATEGORY,
};
pub use space::Pixel;

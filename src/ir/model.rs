//! Core dataset model.
//!
//! The IR follows the Waffle dataset schema: every category belongs to a
//! supercategory, and ids are 1-based per record kind. The Superb AI
//! adapter reads into and writes from this representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::bbox::BBoxXYXY;
use super::ids::{AnnotationId, CategoryId, ImageId};
use super::space::Pixel;

/// Supercategory assigned when a source provides none.
pub const DEFAULT_SUPERCATEGORY: &str = "object";

/// The learning task a dataset or model is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ObjectDetection,
    Classification,
    Segmentation,
    KeypointDetection,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::ObjectDetection,
        TaskType::Classification,
        TaskType::Segmentation,
        TaskType::KeypointDetection,
    ];

    /// Wire name, as stored in `info.yaml` and `model.yaml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ObjectDetection => "object_detection",
            TaskType::Classification => "classification",
            TaskType::Segmentation => "segmentation",
            TaskType::KeypointDetection => "keypoint_detection",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|task| task.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = TaskType::ALL.iter().map(|t| t.as_str()).collect();
                format!(
                    "Task {} is not supported. Choose one of {}",
                    s,
                    names.join(", ")
                )
            })
    }
}

/// A complete dataset.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub info: DatasetInfo,
    pub images: Vec<Image>,
    pub categories: Vec<Category>,
    pub annotations: Vec<Annotation>,
}

impl Dataset {
    /// Looks up a category by id.
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|cat| cat.id == id)
    }

    /// Annotations attached to `image_id`, in stored order.
    pub fn annotations_for(&self, image_id: ImageId) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(move |ann| ann.image_id == image_id)
    }

    /// Sorts every record list by id.
    pub fn sort_by_id(&mut self) {
        self.images.sort_by_key(|img| img.id);
        self.categories.sort_by_key(|cat| cat.id);
        self.annotations.sort_by_key(|ann| ann.id);
    }
}

/// Dataset-level metadata, persisted as `info.yaml`.
#[derive(Clone, Debug, Default)]
pub struct DatasetInfo {
    pub name: String,

    /// `None` only for datasets that have not been bound to a task yet.
    pub task: Option<TaskType>,

    /// Creation timestamp, formatted by whoever created the dataset.
    pub created: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub id: ImageId,

    /// Path relative to the dataset's raw image directory.
    pub file_name: String,

    pub width: u32,
    pub height: u32,

    /// Name of the file this image was imported from, when it was renamed.
    pub original_file_name: Option<String>,

    pub date_captured: Option<String>,
}

impl Image {
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            original_file_name: None,
            date_captured: None,
        }
    }
}

/// A class label together with the supercategory it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: String,
}

impl Category {
    /// A category that is its own supercategory.
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            supercategory: name.clone(),
            name,
        }
    }

    pub fn with_supercategory(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: supercategory.into(),
        }
    }

    /// True when the category is the only member of its own supercategory
    /// name, i.e. it carries no sub-type.
    pub fn is_own_supercategory(&self) -> bool {
        self.name == self.supercategory
    }
}

/// A labelled bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub bbox: BBoxXYXY<Pixel>,

    /// Stored area; `None` means "derive from the box".
    pub area: Option<f64>,

    pub iscrowd: Option<u8>,

    /// Confidence, set for model predictions only.
    pub score: Option<f64>,
}

impl Annotation {
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBoxXYXY<Pixel>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox,
            area: None,
            iscrowd: None,
            score: None,
        }
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_iscrowd(mut self, iscrowd: u8) -> Self {
        self.iscrowd = Some(iscrowd);
        self
    }

    /// Area to persist: the stored one, or the box area.
    pub fn effective_area(&self) -> f64 {
        self.area.unwrap_or_else(|| self.bbox.area())
    }
}

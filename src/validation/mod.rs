//! Dataset validation.
//!
//! [`validate_dataset`] checks the in-memory records: unique ids, valid
//! references, usable names and sane boxes. [`validate_raw_images`] checks
//! that a Waffle dataset's `raw/` directory holds every image it lists.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::Path;

use crate::ir::{Annotation, BBoxXYXY, Dataset, ImageId, Pixel};

/// Boxes may overhang the image by this many pixels before they count as
/// out of bounds.
const BOUNDS_TOLERANCE: f64 = 0.5;

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Treat warnings as failures.
    pub strict: bool,
}

pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();
    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &mut report);
    report
}

/// Reports every image whose file is missing under `raw_image_dir`.
pub fn validate_raw_images(dataset: &Dataset, raw_image_dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::new();
    for image in &dataset.images {
        if image.file_name.is_empty() {
            continue;
        }
        let path = raw_image_dir.join(&image.file_name);
        if !path.is_file() {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageFile,
                format!("{} does not exist", path.display()),
                IssueContext::Image {
                    id: image.id.as_u64(),
                },
            ));
        }
    }
    report
}

/// Remembers the first position of each key; returns it on a repeat.
struct FirstSeen<K>(HashMap<K, usize>);

impl<K: Eq + Hash> FirstSeen<K> {
    fn new() -> Self {
        Self(HashMap::new())
    }

    fn repeat_of(&mut self, key: K, idx: usize) -> Option<usize> {
        match self.0.get(&key) {
            Some(first) => Some(*first),
            None => {
                self.0.insert(key, idx);
                None
            }
        }
    }
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut ids = FirstSeen::new();

    for (idx, image) in dataset.images.iter().enumerate() {
        let context = IssueContext::Image {
            id: image.id.as_u64(),
        };

        if let Some(first) = ids.repeat_of(image.id, idx) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!("image id {} repeats the one at index {}", image.id, first),
                context.clone(),
            ));
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!("dimensions {}x{} must be positive", image.width, image.height),
                context.clone(),
            ));
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "empty file_name",
                context,
            ));
        }
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut ids = FirstSeen::new();
    let mut names: HashMap<(&str, &str), u64> = HashMap::new();

    for (idx, category) in dataset.categories.iter().enumerate() {
        let id = category.id.as_u64();

        if let Some(first) = ids.repeat_of(category.id, idx) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!("category id {} repeats the one at index {}", id, first),
                IssueContext::Category { id },
            ));
        }

        if category.supercategory.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptySupercategory,
                format!("category '{}' has an empty supercategory", category.name),
                IssueContext::Category { id },
            ));
        }

        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "empty category name",
                IssueContext::Category { id },
            ));
            continue;
        }

        let key = (category.supercategory.as_str(), category.name.as_str());
        if let Some(first_id) = names.get(&key) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateCategoryName,
                format!(
                    "'{}/{}' is also used by category {}",
                    category.supercategory, category.name, first_id
                ),
                IssueContext::Category { id },
            ));
        } else {
            names.insert(key, id);
        }
    }
}

fn validate_annotations(dataset: &Dataset, report: &mut ValidationReport) {
    let category_ids: HashSet<_> = dataset.categories.iter().map(|cat| cat.id).collect();
    let image_sizes: HashMap<ImageId, (u32, u32)> = dataset
        .images
        .iter()
        .map(|img| (img.id, (img.width, img.height)))
        .collect();
    let mut ids = FirstSeen::new();

    for (idx, ann) in dataset.annotations.iter().enumerate() {
        let id = ann.id.as_u64();

        if let Some(first) = ids.repeat_of(ann.id, idx) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!("annotation id {} repeats the one at index {}", id, first),
                IssueContext::Annotation { id },
            ));
        }

        let image_size = image_sizes.get(&ann.image_id).copied();
        if image_size.is_none() {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("references missing image {}", ann.image_id),
                IssueContext::Annotation { id },
            ));
        }

        if !category_ids.contains(&ann.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!("references missing category {}", ann.category_id),
                IssueContext::Annotation { id },
            ));
        }

        validate_bbox(ann, image_size, report);
    }
}

fn validate_bbox(ann: &Annotation, image_size: Option<(u32, u32)>, report: &mut ValidationReport) {
    let id = ann.id.as_u64();
    let bbox: &BBoxXYXY<Pixel> = &ann.bbox;

    if !bbox.is_finite() {
        report.add(ValidationIssue::error(
            IssueCode::BBoxNotFinite,
            format!("non-finite box {}", describe(bbox)),
            IssueContext::Annotation { id },
        ));
        return;
    }

    if !bbox.is_ordered() {
        report.add(ValidationIssue::error(
            IssueCode::InvalidBBoxOrdering,
            format!("box {} has min > max", describe(bbox)),
            IssueContext::Annotation { id },
        ));
    }

    if bbox.area() <= 0.0 {
        report.add(ValidationIssue::warning(
            IssueCode::InvalidBBoxArea,
            format!("box {} has no area", describe(bbox)),
            IssueContext::Annotation { id },
        ));
    }

    if let Some((width, height)) = image_size {
        let (w, h) = (f64::from(width), f64::from(height));
        if bbox.xmin() < -BOUNDS_TOLERANCE
            || bbox.ymin() < -BOUNDS_TOLERANCE
            || bbox.xmax() > w + BOUNDS_TOLERANCE
            || bbox.ymax() > h + BOUNDS_TOLERANCE
        {
            report.add(ValidationIssue::error(
                IssueCode::BBoxOutOfBounds,
                format!("box {} leaves the {}x{} image", describe(bbox), width, height),
                IssueContext::Annotation { id },
            ));
        }
    }
}

/// `[x, y, w, h]`, the way both Waffle and Superb AI store boxes.
fn describe(bbox: &BBoxXYXY<Pixel>) -> String {
    let (x, y, w, h) = bbox.to_xywh();
    format!("[{:.1}, {:.1}, {:.1}, {:.1}]", x, y, w, h)
}

//! Waffle dataset directory reader and writer.
//!
//! A Waffle dataset lives in `<root_dir>/<name>/`:
//!
//! ```text
//! info.yaml                  name, task, created
//! raw/<file_name>            image binaries
//! images/<image_id>.json     one record per image
//! annotations/<id>.json      one record per annotation, bbox as [x, y, w, h]
//! categories/<id>.json       one record per category
//! sets/<split>.json          JSON array of image ids
//! ```
//!
//! Readers sort every record list by id, so the IR is the same no matter
//! which order the filesystem yields files in.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::io_util::{collect_files_with_extensions, read_json, read_yaml, write_json, write_yaml};
use super::model::{Annotation, Category, Dataset, DatasetInfo, Image, TaskType};
use super::{AnnotationId, BBoxXYXY, CategoryId, ImageId, Pixel, DEFAULT_SUPERCATEGORY};
use crate::error::WaffleError;

/// Root directory used when none is given.
pub const DEFAULT_ROOT_DIR: &str = "./datasets";

const INFO_FILE: &str = "info.yaml";
const RAW_IMAGE_DIR: &str = "raw";
const IMAGE_DIR: &str = "images";
const ANNOTATION_DIR: &str = "annotations";
const CATEGORY_DIR: &str = "categories";
const SET_DIR: &str = "sets";
const UNLABELED_SET: &str = "unlabeled";

// ============================================================================
// On-disk record types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct InfoRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task: Option<TaskType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageRecord {
    image_id: u64,
    file_name: String,
    width: u32,
    height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_captured: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationRecord {
    annotation_id: u64,
    image_id: u64,
    category_id: u64,
    /// `[x, y, width, height]` in pixels.
    bbox: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iscrowd: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CategoryRecord {
    category_id: u64,
    #[serde(default)]
    supercategory: Option<String>,
    name: String,
}

// ============================================================================
// Dataset handle
// ============================================================================

/// A Waffle dataset on disk, identified by name and root directory.
#[derive(Clone, Debug)]
pub struct WaffleDataset {
    name: String,
    root_dir: PathBuf,
    task: TaskType,
}

impl WaffleDataset {
    /// Creates an empty dataset directory and its `info.yaml`.
    ///
    /// Fails with [`WaffleError::DatasetExists`] if the directory is already
    /// there, so an import never merges into someone else's records.
    pub fn new(
        name: impl Into<String>,
        root_dir: Option<&Path>,
        task: TaskType,
    ) -> Result<Self, WaffleError> {
        let dataset = Self {
            name: name.into(),
            root_dir: root_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR)),
            task,
        };

        let dir = dataset.dataset_dir();
        if dir.exists() {
            return Err(WaffleError::DatasetExists { path: dir });
        }
        fs::create_dir_all(&dir).map_err(WaffleError::Io)?;

        let info = InfoRecord {
            name: dataset.name.clone(),
            task: Some(task),
            created: Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
        };
        write_yaml(&dataset.info_file(), &info)?;
        info!(dataset = %dataset.name, path = %dir.display(), "created dataset");

        Ok(dataset)
    }

    /// Opens an existing dataset by reading its `info.yaml`.
    pub fn open(name: impl Into<String>, root_dir: Option<&Path>) -> Result<Self, WaffleError> {
        let name = name.into();
        let root_dir = root_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR));
        let info_file = root_dir.join(&name).join(INFO_FILE);
        if !info_file.is_file() {
            return Err(WaffleError::DatasetNotFound { path: info_file });
        }

        let info: InfoRecord = read_yaml(&info_file)?;
        Ok(Self {
            name,
            root_dir,
            task: info.task.unwrap_or(TaskType::ObjectDetection),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> TaskType {
        self.task
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.root_dir.join(&self.name)
    }

    pub fn info_file(&self) -> PathBuf {
        self.dataset_dir().join(INFO_FILE)
    }

    /// Where image binaries live; `Image::file_name` is relative to this.
    pub fn raw_image_dir(&self) -> PathBuf {
        self.dataset_dir().join(RAW_IMAGE_DIR)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.dataset_dir().join(IMAGE_DIR)
    }

    pub fn annotation_dir(&self) -> PathBuf {
        self.dataset_dir().join(ANNOTATION_DIR)
    }

    pub fn category_dir(&self) -> PathBuf {
        self.dataset_dir().join(CATEGORY_DIR)
    }

    pub fn set_dir(&self) -> PathBuf {
        self.dataset_dir().join(SET_DIR)
    }

    pub fn unlabeled_set_file(&self) -> PathBuf {
        self.set_file(UNLABELED_SET)
    }

    pub fn set_file(&self, split: &str) -> PathBuf {
        self.set_dir().join(format!("{split}.json"))
    }

    pub fn read(&self) -> Result<Dataset, WaffleError> {
        read_waffle_dir(&self.dataset_dir())
    }

    /// Writes `dataset`, keeping this handle's name and task in `info.yaml`.
    pub fn write(&self, dataset: &Dataset) -> Result<(), WaffleError> {
        let mut dataset = dataset.clone();
        dataset.info.name = self.name.clone();
        dataset.info.task = Some(self.task);
        if dataset.info.created.is_none() {
            dataset.info.created = read_yaml::<InfoRecord>(&self.info_file())
                .ok()
                .and_then(|info| info.created);
        }
        write_waffle_dir(&self.dataset_dir(), &dataset)
    }

    /// Writes a split file (`sets/<split>.json`) listing image ids.
    pub fn write_set(&self, split: &str, image_ids: &[ImageId]) -> Result<(), WaffleError> {
        let ids: Vec<u64> = image_ids.iter().map(ImageId::as_u64).collect();
        write_json(&self.set_file(split), &ids)
    }

    /// Reads a split file. A missing file is an empty split.
    pub fn read_set(&self, split: &str) -> Result<Vec<ImageId>, WaffleError> {
        let path = self.set_file(split);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let ids: Vec<u64> = read_json(&path)?;
        Ok(ids.into_iter().map(ImageId::new).collect())
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a Waffle dataset directory into IR.
///
/// `info.yaml` is required; record directories that do not exist are read as
/// empty.
pub fn read_waffle_dir(dataset_dir: &Path) -> Result<Dataset, WaffleError> {
    let info_file = dataset_dir.join(INFO_FILE);
    if !info_file.is_file() {
        return Err(WaffleError::DatasetNotFound { path: info_file });
    }
    let info: InfoRecord = read_yaml(&info_file)?;

    let mut dataset = Dataset {
        info: DatasetInfo {
            name: info.name,
            task: info.task,
            created: info.created,
        },
        ..Default::default()
    };

    for record in read_records::<ImageRecord>(&dataset_dir.join(IMAGE_DIR))? {
        dataset.images.push(Image {
            id: ImageId::new(record.image_id),
            file_name: record.file_name,
            width: record.width,
            height: record.height,
            original_file_name: record.original_file_name,
            date_captured: record.date_captured,
        });
    }

    for record in read_records::<CategoryRecord>(&dataset_dir.join(CATEGORY_DIR))? {
        dataset.categories.push(Category {
            id: CategoryId::new(record.category_id),
            name: record.name,
            supercategory: record
                .supercategory
                .unwrap_or_else(|| DEFAULT_SUPERCATEGORY.to_string()),
        });
    }

    for record in read_records::<AnnotationRecord>(&dataset_dir.join(ANNOTATION_DIR))? {
        let [x, y, w, h] = record.bbox;
        dataset.annotations.push(Annotation {
            id: AnnotationId::new(record.annotation_id),
            image_id: ImageId::new(record.image_id),
            category_id: CategoryId::new(record.category_id),
            bbox: BBoxXYXY::<Pixel>::from_xywh(x, y, w, h),
            area: record.area,
            iscrowd: record.iscrowd,
            score: record.score,
        });
    }

    dataset.sort_by_id();
    debug!(
        path = %dataset_dir.display(),
        images = dataset.images.len(),
        categories = dataset.categories.len(),
        annotations = dataset.annotations.len(),
        "read waffle dataset"
    );
    Ok(dataset)
}

/// Writes a dataset as a Waffle directory.
///
/// The `images/`, `annotations/` and `categories/` directories are replaced
/// wholesale so that records removed from `dataset` do not linger. `raw/`
/// and `sets/` are left untouched.
pub fn write_waffle_dir(dataset_dir: &Path, dataset: &Dataset) -> Result<(), WaffleError> {
    fs::create_dir_all(dataset_dir).map_err(WaffleError::Io)?;

    let name = if dataset.info.name.is_empty() {
        dataset_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        dataset.info.name.clone()
    };
    let info = InfoRecord {
        name,
        task: dataset.info.task,
        created: dataset.info.created.clone(),
    };
    write_yaml(&dataset_dir.join(INFO_FILE), &info)?;

    for dir in [IMAGE_DIR, ANNOTATION_DIR, CATEGORY_DIR] {
        let path = dataset_dir.join(dir);
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(WaffleError::Io)?;
        }
        fs::create_dir_all(&path).map_err(WaffleError::Io)?;
    }

    for image in &dataset.images {
        let record = ImageRecord {
            image_id: image.id.as_u64(),
            file_name: image.file_name.clone(),
            width: image.width,
            height: image.height,
            original_file_name: image.original_file_name.clone(),
            date_captured: image.date_captured.clone(),
        };
        write_json(&record_path(dataset_dir, IMAGE_DIR, record.image_id), &record)?;
    }

    for category in &dataset.categories {
        let record = CategoryRecord {
            category_id: category.id.as_u64(),
            supercategory: Some(category.supercategory.clone()),
            name: category.name.clone(),
        };
        write_json(
            &record_path(dataset_dir, CATEGORY_DIR, record.category_id),
            &record,
        )?;
    }

    for annotation in &dataset.annotations {
        let (x, y, w, h) = annotation.bbox.to_xywh();
        let record = AnnotationRecord {
            annotation_id: annotation.id.as_u64(),
            image_id: annotation.image_id.as_u64(),
            category_id: annotation.category_id.as_u64(),
            bbox: [x, y, w, h],
            area: Some(annotation.effective_area()),
            iscrowd: Some(annotation.iscrowd.unwrap_or(0)),
            score: annotation.score,
        };
        write_json(
            &record_path(dataset_dir, ANNOTATION_DIR, record.annotation_id),
            &record,
        )?;
    }

    Ok(())
}

fn record_path(dataset_dir: &Path, kind: &str, id: u64) -> PathBuf {
    dataset_dir.join(kind).join(format!("{id}.json"))
}

fn read_records<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>, WaffleError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    collect_files_with_extensions(dir, &["json"])?
        .iter()
        .map(|path| read_json(path))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        Dataset {
            info: DatasetInfo {
                name: "cars".into(),
                task: Some(TaskType::ObjectDetection),
                created: None,
            },
            images: vec![
                Image::new(2u64, "b.jpg", 1920, 1080),
                Image::new(1u64, "a.jpg", 640, 480),
            ],
            categories: vec![
                Category::with_supercategory(1u64, "sedan", "car"),
                Category::with_supercategory(2u64, "suv", "car"),
                Category::new(3u64, "person"),
            ],
            annotations: vec![
                Annotation::new(1u64, 1u64, 1u64, BBoxXYXY::from_xywh(10.0, 20.0, 30.0, 40.0)),
                Annotation::new(2u64, 2u64, 3u64, BBoxXYXY::from_xywh(1.5, 2.5, 3.0, 4.0))
                    .with_iscrowd(1),
            ],
        }
    }

    #[test]
    fn new_creates_info_and_rejects_existing() {
        let temp = tempfile::tempdir().expect("create temp dir");

        let dataset = WaffleDataset::new("cars", Some(temp.path()), TaskType::ObjectDetection)
            .expect("create dataset");
        assert!(dataset.info_file().is_file());
        assert_eq!(dataset.raw_image_dir(), temp.path().join("cars/raw"));
        assert_eq!(
            dataset.unlabeled_set_file(),
            temp.path().join("cars/sets/unlabeled.json")
        );

        let err = WaffleDataset::new("cars", Some(temp.path()), TaskType::ObjectDetection)
            .unwrap_err();
        assert!(matches!(err, WaffleError::DatasetExists { .. }));
    }

    #[test]
    fn open_missing_dataset_fails() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = WaffleDataset::open("nope", Some(temp.path())).unwrap_err();
        assert!(matches!(err, WaffleError::DatasetNotFound { .. }));
    }

    #[test]
    fn write_then_read_preserves_records_sorted_by_id() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("cars");

        write_waffle_dir(&dir, &sample_dataset()).expect("write dataset");
        let restored = read_waffle_dir(&dir).expect("read dataset");

        assert_eq!(restored.info.name, "cars");
        assert_eq!(restored.info.task, Some(TaskType::ObjectDetection));
        assert_eq!(restored.images[0].file_name, "a.jpg");
        assert_eq!(restored.images[1].file_name, "b.jpg");
        assert_eq!(restored.categories[1].name, "suv");
        assert_eq!(restored.categories[1].supercategory, "car");

        let second = &restored.annotations[1];
        assert_eq!(second.category_id, CategoryId(3));
        assert_eq!(second.bbox.to_xywh(), (1.5, 2.5, 3.0, 4.0));
        assert_eq!(second.iscrowd, Some(1));
        assert_eq!(second.area, Some(12.0));
    }

    #[test]
    fn annotation_record_uses_xywh_on_disk() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("cars");
        write_waffle_dir(&dir, &sample_dataset()).expect("write dataset");

        let raw: serde_json::Value =
            read_json(&dir.join("annotations/1.json")).expect("read record");
        assert_eq!(raw["bbox"], serde_json::json!([10.0, 20.0, 30.0, 40.0]));
        assert_eq!(raw["area"], 1200.0);
        assert_eq!(raw["iscrowd"], 0);
    }

    #[test]
    fn missing_supercategory_defaults_to_object() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("plain");
        fs::create_dir_all(dir.join("categories")).unwrap();
        fs::write(dir.join("info.yaml"), "name: plain\n").unwrap();
        fs::write(
            dir.join("categories/1.json"),
            r#"{"category_id": 1, "name": "person"}"#,
        )
        .unwrap();

        let dataset = read_waffle_dir(&dir).expect("read dataset");
        assert_eq!(dataset.info.task, None);
        assert_eq!(dataset.categories[0].supercategory, "object");
    }

    #[test]
    fn rewrite_drops_stale_records() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("cars");
        write_waffle_dir(&dir, &sample_dataset()).expect("first write");

        let mut smaller = sample_dataset();
        smaller.annotations.truncate(1);
        write_waffle_dir(&dir, &smaller).expect("second write");

        assert!(!dir.join("annotations/2.json").exists());
        assert_eq!(read_waffle_dir(&dir).unwrap().annotations.len(), 1);
    }

    #[test]
    fn sets_roundtrip_and_missing_split_is_empty() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dataset = WaffleDataset::new("cars", Some(temp.path()), TaskType::ObjectDetection)
            .expect("create dataset");

        assert!(dataset.read_set("train").unwrap().is_empty());
        dataset
            .write_set("train", &[ImageId(3), ImageId(1)])
            .expect("write set");
        assert_eq!(
            dataset.read_set("train").unwrap(),
            vec![ImageId(3), ImageId(1)]
        );
    }

    #[test]
    fn handle_write_keeps_name_task_and_created() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let handle = WaffleDataset::new("renamed", Some(temp.path()), TaskType::ObjectDetection)
            .expect("create dataset");

        handle.write(&sample_dataset()).expect("write dataset");
        let restored = handle.read().expect("read dataset");
        assert_eq!(restored.info.name, "renamed");
        assert!(restored.info.created.is_some());
    }
}

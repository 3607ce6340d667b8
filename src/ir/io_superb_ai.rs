//! Superb AI export reader and writer.
//!
//! Superb AI exports a labeling project as a directory tree:
//!
//! ```text
//! project.json        label interface: object classes and their properties
//! meta/**/*.json      one meta file per asset (image or image sequence)
//! labels/<id>.json    the objects labelled on that asset
//! ```
//!
//! Image binaries are addressed by each meta's `data_key` and may live in a
//! separate image directory.
//!
//! # Categories and supercategories
//!
//! Superb AI has a flat list of object classes. Waffle categories are
//! two-level (supercategory / name). The writer emits one object class per
//! supercategory. When a supercategory has sub-types, the class gets a
//! checkbox property named `<supercategory>_Type` with one option per
//! category. The reader reverses this: a class carrying such a property
//! expands into one category per option, and each labelled object takes
//! its category from the option it selected.
//!
//! # ID remapping
//!
//! Superb AI ids (class ids, label ids, object ids) are not carried over.
//! The reader assigns fresh sequential ids starting at 1. Categories are
//! numbered in project order. Images and annotations are numbered in meta
//! file order, and meta files are visited sorted by relative path.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, RngExt, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::io_util::{
    collect_files_with_extensions, copy_file, read_image_dimensions, read_json, write_json,
};
use super::io_waffle::WaffleDataset;
use super::model::{Annotation, Category, Dataset, Image, TaskType};
use super::{AnnotationId, BBoxXYXY, CategoryId, IdCounter, ImageId, Pixel};
use crate::error::WaffleError;

const PROJECT_FILE: &str = "project.json";
const META_DIR: &str = "meta";
const LABEL_DIR: &str = "labels";
const IMAGE_DIR: &str = "images";

const DATA_TYPE_IMAGE: &str = "image";
const DATA_TYPE_IMAGE_SEQUENCE: &str = "image sequence";
const ANNOTATION_TYPE_BOX: &str = "box";
const PROPERTY_TYPE_CHECKBOX: &str = "checkbox";

/// Label interface values Superb AI accepts for an uploaded image project.
const PROJECT_TYPE: &str = "image-siesta";
const PROJECT_VERSION: &str = "0.6.5";

pub const DEFAULT_WORK_ASSIGNEE: &str = "research@snuailab.ai";
pub const DEFAULT_STATUS: &str = "Waffle_dataset to Superb AI Dataset";

// ============================================================================
// Superb AI schema types (internal)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SuperbProject {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    project_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    #[serde(alias = "data-type")]
    data_type: String,

    #[serde(default)]
    categorization: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_detection: Option<ObjectSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_tracking: Option<ObjectSection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectSection {
    #[serde(default)]
    keypoints: Vec<Value>,
    #[serde(default)]
    object_groups: Vec<Value>,
    object_classes: Vec<ObjectClass>,
    #[serde(default)]
    annotation_types: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectClass {
    /// Numeric in our exports, a UUID string in platform exports.
    #[serde(default)]
    id: Value,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(default)]
    properties: Vec<ClassProperty>,
    #[serde(default)]
    constraints: Map<String, Value>,
    #[serde(default)]
    ai_class_map: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassProperty {
    #[serde(default)]
    id: Value,
    name: String,
    #[serde(rename = "type")]
    property_type: String,
    #[serde(default)]
    options: Vec<PropertyOption>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    render_value: bool,
    #[serde(default)]
    default_value: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PropertyOption {
    #[serde(default)]
    id: Value,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SuperbMeta {
    data_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_info: Option<ImageInfo>,
    #[serde(default)]
    label_id: Value,
    #[serde(default)]
    label_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated_date: Option<String>,
    #[serde(default)]
    tags: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    work_assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    /// File names of the frames, for image sequences only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    frames: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct ImageInfo {
    width: u32,
    height: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SuperbLabel {
    #[serde(default)]
    objects: Vec<SuperbObject>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SuperbObject {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    class_id: Value,
    class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<ObjectAnnotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    frames: Vec<ObjectFrame>,
    #[serde(default)]
    properties: Vec<ObjectProperty>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectAnnotation {
    coord: BoxCoord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<AnnotationMeta>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct BoxCoord {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationMeta {
    z_index: usize,
    visible: bool,
    alpha: f64,
    color: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectFrame {
    #[serde(deserialize_with = "frame_number")]
    num: usize,
    annotation: ObjectAnnotation,
    #[serde(default)]
    properties: Vec<ObjectProperty>,
}

/// Frame numbers are integers, but some exports write them as strings.
fn frame_number<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FrameNumber {
        Int(usize),
        Text(String),
    }

    match FrameNumber::deserialize(deserializer)? {
        FrameNumber::Int(num) => Ok(num),
        FrameNumber::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid frame number: {text:?}"))
        }),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectProperty {
    #[serde(rename = "type")]
    property_type: String,
    #[serde(default)]
    property_id: Value,
    property_name: String,
    #[serde(default)]
    option_names: Vec<String>,
}

// ============================================================================
// Export options
// ============================================================================

/// Options for [`write_superb_ai`] and [`export_superb_ai`].
#[derive(Clone, Debug)]
pub struct SuperbExportOptions {
    /// Seed for the class color palette. `None` draws fresh colors each run.
    pub seed: Option<u64>,

    /// Written to every meta file's `work_assignee`.
    pub work_assignee: String,

    /// Written to every meta file's `status`.
    pub status: String,
}

impl Default for SuperbExportOptions {
    fn default() -> Self {
        Self {
            seed: None,
            work_assignee: DEFAULT_WORK_ASSIGNEE.to_string(),
            status: DEFAULT_STATUS.to_string(),
        }
    }
}

// ============================================================================
// Public API: import
// ============================================================================

/// Reads a Superb AI export into IR.
///
/// `label_dir` holds `project.json`, `meta/` and `labels/`. Image paths are
/// resolved against `image_dir`. Every referenced image must exist. Each
/// `Image::file_name` is that image's path relative to `image_dir`.
pub fn read_superb_ai(image_dir: &Path, label_dir: &Path) -> Result<Dataset, WaffleError> {
    let project_path = label_dir.join(PROJECT_FILE);
    if !project_path.is_file() {
        return Err(WaffleError::SuperbAiProjectNotFound { path: project_path });
    }
    let project: SuperbProject = read_json(&project_path)?;

    let meta_root = label_dir.join(META_DIR);
    let meta_paths = if meta_root.is_dir() {
        collect_files_with_extensions(&meta_root, &["json"])?
    } else {
        warn!(path = %meta_root.display(), "no meta directory; importing categories only");
        Vec::new()
    };

    let mut reader = SuperbReader {
        image_dir,
        label_dir,
        images: Vec::new(),
        annotations: Vec::new(),
        image_ids: IdCounter::new(),
        annotation_ids: IdCounter::new(),
        table: CategoryTable::default(),
    };

    match project.data_type.as_str() {
        DATA_TYPE_IMAGE => {
            let section =
                required_section(&project.object_detection, "object_detection", &project_path)?;
            reader.table = CategoryTable::from_classes(&section.object_classes);
            info!(total = meta_paths.len(), "importing superb ai image dataset");
            for meta_path in &meta_paths {
                reader.read_image_asset(meta_path)?;
            }
        }
        DATA_TYPE_IMAGE_SEQUENCE => {
            let section =
                required_section(&project.object_tracking, "object_tracking", &project_path)?;
            reader.table = CategoryTable::from_classes(&section.object_classes);
            info!(
                sequences = meta_paths.len(),
                "importing superb ai image sequence dataset"
            );
            for meta_path in &meta_paths {
                reader.read_sequence_asset(meta_path)?;
            }
        }
        other => {
            return Err(WaffleError::UnsupportedFormat(format!(
                "Superb AI data_type '{}' (supported: '{}', '{}')",
                other, DATA_TYPE_IMAGE, DATA_TYPE_IMAGE_SEQUENCE
            )));
        }
    }

    Ok(Dataset {
        images: reader.images,
        categories: reader.table.categories,
        annotations: reader.annotations,
        ..Default::default()
    })
}

/// Imports a Superb AI export into an (empty) Waffle dataset.
///
/// Images are copied into the dataset's `raw/` directory under their
/// `file_name`, records are written, and an empty unlabeled split is created.
pub fn import_superb_ai(
    image_dir: &Path,
    label_dir: &Path,
    target: &WaffleDataset,
) -> Result<Dataset, WaffleError> {
    let dataset = read_superb_ai(image_dir, label_dir)?;
    store_imported(image_dir, &dataset, target)
}

/// Creates dataset `name` under `root_dir` from a Superb AI export.
///
/// The export is read before anything is created. If copying images or
/// writing records fails afterwards, the new dataset directory is removed
/// again so the import can be retried under the same name.
pub fn create_from_superb_ai(
    image_dir: &Path,
    label_dir: &Path,
    name: &str,
    root_dir: Option<&Path>,
    task: TaskType,
) -> Result<(WaffleDataset, Dataset), WaffleError> {
    let dataset = read_superb_ai(image_dir, label_dir)?;
    let target = WaffleDataset::new(name, root_dir, task)?;

    match store_imported(image_dir, &dataset, &target) {
        Ok(imported) => Ok((target, imported)),
        Err(err) => {
            let dir = target.dataset_dir();
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!(path = %dir.display(), error = %cleanup, "failed to remove partial dataset");
            }
            Err(err)
        }
    }
}

fn store_imported(
    image_dir: &Path,
    dataset: &Dataset,
    target: &WaffleDataset,
) -> Result<Dataset, WaffleError> {
    let raw_dir = target.raw_image_dir();
    for image in &dataset.images {
        let src = image_dir.join(&image.file_name);
        let dst = raw_dir.join(&image.file_name);
        copy_file(&src, &dst)?;
        debug!(src = %src.display(), dst = %dst.display(), "copied image");
    }

    target.write(dataset)?;
    target.write_set("unlabeled", &[])?;

    info!(
        dataset = target.name(),
        images = dataset.images.len(),
        categories = dataset.categories.len(),
        annotations = dataset.annotations.len(),
        "imported superb ai dataset"
    );
    target.read()
}

/// Parses a `project.json` document and returns the categories an import
/// would create, without touching the filesystem.
pub fn categories_from_project_slice(bytes: &[u8]) -> Result<Vec<Category>, WaffleError> {
    let project: SuperbProject =
        serde_json::from_slice(bytes).map_err(|source| WaffleError::JsonParse {
            path: PathBuf::from(PROJECT_FILE),
            source,
        })?;
    let section = match project.data_type.as_str() {
        DATA_TYPE_IMAGE_SEQUENCE => project.object_tracking.as_ref(),
        _ => project.object_detection.as_ref(),
    };
    Ok(section
        .map(|section| CategoryTable::from_classes(&section.object_classes).categories)
        .unwrap_or_default())
}

/// Fuzz-only entrypoint for label file parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label(bytes: &[u8]) -> Result<usize, serde_json::Error> {
    let label: SuperbLabel = serde_json::from_slice(bytes)?;
    Ok(label.objects.len())
}

// ============================================================================
// Public API: export
// ============================================================================

/// Writes a dataset as a Superb AI export.
///
/// Creates `images/`, `meta/`, `labels/` and `project.json` under
/// `export_dir`, replacing any existing record directories. When
/// `raw_image_dir` is given, each image is copied from
/// `raw_image_dir/<file_name>` to `images/<file_name>`.
pub fn write_superb_ai(
    export_dir: &Path,
    dataset: &Dataset,
    raw_image_dir: Option<&Path>,
    opts: &SuperbExportOptions,
) -> Result<(), WaffleError> {
    let export = ir_to_superb(dataset, opts, export_dir)?;

    // Stale meta files would come back as extra images on the next read.
    for dir in [IMAGE_DIR, META_DIR, LABEL_DIR] {
        let path = export_dir.join(dir);
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(WaffleError::Io)?;
        }
        fs::create_dir_all(&path).map_err(WaffleError::Io)?;
    }
    write_json(&export_dir.join(PROJECT_FILE), &export.project)?;

    for asset in &export.assets {
        if let Some(raw_dir) = raw_image_dir {
            copy_file(
                &raw_dir.join(&asset.file_name),
                &export_dir.join(IMAGE_DIR).join(&asset.file_name),
            )?;
        }
        write_json(
            &export_dir
                .join(META_DIR)
                .join(format!("{}.json", asset.file_name)),
            &asset.meta,
        )?;
        write_json(&export_dir.join(&asset.label_file), &asset.label)?;
        debug!(file_name = %asset.file_name, "exported asset");
    }

    Ok(())
}

/// Exports a Waffle dataset, images included, to `export_dir`.
///
/// Returns `export_dir`.
pub fn export_superb_ai(
    source: &WaffleDataset,
    export_dir: &Path,
    opts: &SuperbExportOptions,
) -> Result<PathBuf, WaffleError> {
    info!(dataset = source.name(), "exporting superb ai dataset");
    let dataset = source.read()?;
    let raw_dir = source.raw_image_dir();
    write_superb_ai(export_dir, &dataset, Some(&raw_dir), opts)?;
    info!(
        path = %export_dir.display(),
        images = dataset.images.len(),
        "exported superb ai dataset"
    );
    Ok(export_dir.to_path_buf())
}

/// Renders the `project.json` a [`write_superb_ai`] call would produce.
pub fn to_superb_project_string(
    dataset: &Dataset,
    opts: &SuperbExportOptions,
) -> Result<String, WaffleError> {
    let export = ir_to_superb(dataset, opts, Path::new(PROJECT_FILE))?;
    serde_json::to_string_pretty(&export.project).map_err(|source| WaffleError::JsonWrite {
        path: PathBuf::from(PROJECT_FILE),
        source,
    })
}

// ============================================================================
// Category reconstruction
// ============================================================================

/// Categories created from a project's object classes, plus the lookup used
/// to resolve each labelled object back to one of them.
#[derive(Debug, Default)]
struct CategoryTable {
    categories: Vec<Category>,
    classes: HashMap<String, ClassCategories>,
}

#[derive(Debug)]
enum ClassCategories {
    /// The class is a category on its own.
    Plain(CategoryId),
    /// The class is a supercategory; objects pick a sub-type via a property.
    Typed {
        property_name: String,
        by_option: HashMap<String, CategoryId>,
    },
}

impl CategoryTable {
    fn from_classes(classes: &[ObjectClass]) -> Self {
        let mut table = CategoryTable::default();
        let mut ids = IdCounter::new();

        for class in classes {
            if table.classes.contains_key(&class.name) {
                warn!(class = %class.name, "duplicate object class; keeping the first");
                continue;
            }

            let property_name = type_property_name(&class.name);
            let type_property = class
                .properties
                .iter()
                .find(|prop| prop.name == property_name && !prop.options.is_empty());

            let entry = match type_property {
                Some(property) => {
                    let mut by_option = HashMap::new();
                    for option in &property.options {
                        if by_option.contains_key(&option.name) {
                            continue;
                        }
                        let id = CategoryId::new(ids.next_id());
                        table.categories.push(Category::with_supercategory(
                            id,
                            option.name.clone(),
                            class.name.clone(),
                        ));
                        by_option.insert(option.name.clone(), id);
                    }
                    ClassCategories::Typed {
                        property_name,
                        by_option,
                    }
                }
                None => {
                    let id = CategoryId::new(ids.next_id());
                    table.categories.push(Category::new(id, class.name.clone()));
                    ClassCategories::Plain(id)
                }
            };
            table.classes.insert(class.name.clone(), entry);
        }

        table
    }

    /// Resolves an object to its category. Frame-level properties (image
    /// sequences) take precedence over object-level ones.
    fn resolve(
        &self,
        class_name: &str,
        property_sets: &[&[ObjectProperty]],
    ) -> Result<CategoryId, String> {
        match self.classes.get(class_name) {
            None => Err(format!("object references unknown class '{}'", class_name)),
            Some(ClassCategories::Plain(id)) => Ok(*id),
            Some(ClassCategories::Typed {
                property_name,
                by_option,
            }) => {
                let selected = property_sets
                    .iter()
                    .flat_map(|props| props.iter())
                    .find(|prop| &prop.property_name == property_name)
                    .and_then(|prop| prop.option_names.first())
                    .ok_or_else(|| {
                        format!(
                            "object of class '{}' has no '{}' option selected",
                            class_name, property_name
                        )
                    })?;
                by_option.get(selected).copied().ok_or_else(|| {
                    format!(
                        "object of class '{}' selects unknown option '{}'",
                        class_name, selected
                    )
                })
            }
        }
    }
}

fn type_property_name(class_name: &str) -> String {
    format!("{}_Type", class_name)
}

// ============================================================================
// Conversion: Superb AI -> IR
// ============================================================================

struct SuperbReader<'a> {
    image_dir: &'a Path,
    label_dir: &'a Path,
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    image_ids: IdCounter,
    annotation_ids: IdCounter,
    table: CategoryTable,
}

impl SuperbReader<'_> {
    fn read_image_asset(&mut self, meta_path: &Path) -> Result<(), WaffleError> {
        let (meta, label) = self.load_asset(meta_path)?;
        let file_name = meta.data_key.trim_start_matches('/').to_string();
        let (width, height) = self.image_dimensions(&file_name, meta.image_info)?;

        let image_id = ImageId::new(self.image_ids.next_id());
        self.images.push(Image::new(image_id, file_name, width, height));

        for object in &label.objects {
            let annotation = object.annotation.as_ref().ok_or_else(|| {
                invalid(
                    meta_path,
                    format!("object of class '{}' has no annotation", object.class_name),
                )
            })?;
            let category_id = self
                .table
                .resolve(&object.class_name, &[object.properties.as_slice()])
                .map_err(|message| invalid(meta_path, message))?;
            self.push_annotation(image_id, category_id, annotation.coord);
        }

        debug!(meta = %meta_path.display(), objects = label.objects.len(), "read image asset");
        Ok(())
    }

    fn read_sequence_asset(&mut self, meta_path: &Path) -> Result<(), WaffleError> {
        let (meta, label) = self.load_asset(meta_path)?;
        let sequence_dir = meta.data_key.trim_start_matches('/');

        // Frame number -> boxes on that frame, frames in first-seen order.
        let mut frame_order: Vec<usize> = Vec::new();
        let mut frames: HashMap<usize, Vec<(CategoryId, BoxCoord)>> = HashMap::new();
        for object in &label.objects {
            for frame in &object.frames {
                let category_id = self
                    .table
                    .resolve(
                        &object.class_name,
                        &[frame.properties.as_slice(), object.properties.as_slice()],
                    )
                    .map_err(|message| invalid(meta_path, message))?;
                frames
                    .entry(frame.num)
                    .or_insert_with(|| {
                        frame_order.push(frame.num);
                        Vec::new()
                    })
                    .push((category_id, frame.annotation.coord));
            }
        }

        for num in frame_order {
            let frame_file = meta.frames.get(num).ok_or_else(|| {
                invalid(
                    meta_path,
                    format!(
                        "frame {} is out of range for {} listed frame(s)",
                        num,
                        meta.frames.len()
                    ),
                )
            })?;
            let file_name = format!("{}/{}", sequence_dir, frame_file);
            let (width, height) = self.image_dimensions(&file_name, meta.image_info)?;

            let image_id = ImageId::new(self.image_ids.next_id());
            self.images.push(Image::new(image_id, file_name, width, height));

            for (category_id, coord) in frames.remove(&num).unwrap_or_default() {
                self.push_annotation(image_id, category_id, coord);
            }
        }

        Ok(())
    }

    fn load_asset(&self, meta_path: &Path) -> Result<(SuperbMeta, SuperbLabel), WaffleError> {
        let meta: SuperbMeta = read_json(meta_path)?;
        let label_rel = meta
            .label_path
            .first()
            .ok_or_else(|| invalid(meta_path, "meta has an empty label_path"))?;
        let label: SuperbLabel = read_json(&self.label_dir.join(label_rel))?;
        Ok((meta, label))
    }

    /// Checks the image exists and returns its size, preferring the meta's
    /// `image_info` over reading the file header.
    fn image_dimensions(
        &self,
        file_name: &str,
        image_info: Option<ImageInfo>,
    ) -> Result<(u32, u32), WaffleError> {
        let path = self.image_dir.join(file_name);
        if !path.is_file() {
            return Err(WaffleError::ImageNotFound { path });
        }
        match image_info {
            Some(info) => Ok((info.width, info.height)),
            None => read_image_dimensions(&path),
        }
    }

    fn push_annotation(&mut self, image_id: ImageId, category_id: CategoryId, coord: BoxCoord) {
        let bbox = BBoxXYXY::<Pixel>::from_xywh(coord.x, coord.y, coord.width, coord.height);
        let mut annotation = Annotation::new(
            AnnotationId::new(self.annotation_ids.next_id()),
            image_id,
            category_id,
            bbox,
        );
        annotation.iscrowd = Some(0);
        self.annotations.push(annotation);
    }
}

fn required_section<'p>(
    section: &'p Option<ObjectSection>,
    key: &str,
    project_path: &Path,
) -> Result<&'p ObjectSection, WaffleError> {
    section
        .as_ref()
        .ok_or_else(|| invalid(project_path, format!("project has no '{}' section", key)))
}

fn invalid(path: &Path, message: impl Into<String>) -> WaffleError {
    WaffleError::SuperbAiInvalid {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

// ============================================================================
// Conversion: IR -> Superb AI
// ============================================================================

struct SuperbExport {
    project: SuperbProject,
    assets: Vec<ExportAsset>,
}

struct ExportAsset {
    file_name: String,
    label_file: String,
    meta: SuperbMeta,
    label: SuperbLabel,
}

/// The object class a supercategory was written as.
struct ClassRef {
    id: u64,
    typed: bool,
}

fn ir_to_superb(
    dataset: &Dataset,
    opts: &SuperbExportOptions,
    export_dir: &Path,
) -> Result<SuperbExport, WaffleError> {
    let mut categories: Vec<&Category> = dataset.categories.iter().collect();
    categories.sort_by_key(|cat| cat.id);

    let colors: BTreeMap<CategoryId, String> = categories
        .iter()
        .map(|cat| cat.id)
        .zip(random_color_codes(categories.len(), opts.seed))
        .collect();

    // Supercategories in first-seen order.
    let mut groups: Vec<(&str, Vec<&Category>)> = Vec::new();
    for &category in &categories {
        match groups
            .iter_mut()
            .find(|(name, _)| *name == category.supercategory)
        {
            Some((_, members)) => members.push(category),
            None => groups.push((category.supercategory.as_str(), vec![category])),
        }
    }

    let mut class_refs: HashMap<&str, ClassRef> = HashMap::new();
    let mut object_classes = Vec::with_capacity(groups.len());
    for (supercategory, members) in &groups {
        let supercategory = *supercategory;
        let first = members[0];
        let class_id = first.id.as_u64();
        let typed = !(members.len() == 1 && first.is_own_supercategory());

        let properties = if typed {
            vec![ClassProperty {
                id: json!(class_id),
                name: type_property_name(supercategory),
                property_type: PROPERTY_TYPE_CHECKBOX.to_string(),
                options: members
                    .iter()
                    .map(|cat| PropertyOption {
                        id: json!(cat.id.as_u64()),
                        name: cat.name.clone(),
                    })
                    .collect(),
                required: true,
                description: String::new(),
                render_value: false,
                default_value: Vec::new(),
            }]
        } else {
            Vec::new()
        };

        object_classes.push(ObjectClass {
            id: json!(class_id),
            name: supercategory.to_string(),
            color: colors.get(&first.id).cloned(),
            properties,
            constraints: Map::new(),
            ai_class_map: Vec::new(),
            annotation_type: Some(ANNOTATION_TYPE_BOX.to_string()),
        });
        class_refs.insert(supercategory, ClassRef { id: class_id, typed });
    }

    let project = SuperbProject {
        project_type: Some(PROJECT_TYPE.to_string()),
        version: Some(PROJECT_VERSION.to_string()),
        data_type: DATA_TYPE_IMAGE.to_string(),
        categorization: json!({ "properties": [] }),
        object_detection: Some(ObjectSection {
            keypoints: Vec::new(),
            object_groups: Vec::new(),
            object_classes,
            annotation_types: vec![ANNOTATION_TYPE_BOX.to_string()],
        }),
        object_tracking: None,
    };

    let category_by_id: HashMap<CategoryId, &Category> =
        categories.iter().map(|cat| (cat.id, *cat)).collect();

    let mut annotations_by_image: BTreeMap<ImageId, Vec<&Annotation>> = BTreeMap::new();
    for ann in &dataset.annotations {
        annotations_by_image
            .entry(ann.image_id)
            .or_default()
            .push(ann);
    }

    let mut images: Vec<&Image> = dataset.images.iter().collect();
    images.sort_by_key(|img| img.id);

    let updated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut assets = Vec::with_capacity(images.len());

    for image in images {
        let image_id = image.id.as_u64();
        let label_file = format!("{}/{}.json", LABEL_DIR, image_id);

        let mut anns = annotations_by_image.remove(&image.id).unwrap_or_default();
        anns.sort_by_key(|ann| ann.id);

        let mut objects = Vec::with_capacity(anns.len());
        for (z_index, ann) in anns.into_iter().enumerate() {
            let category = category_by_id.get(&ann.category_id).ok_or_else(|| {
                invalid(
                    export_dir,
                    format!(
                        "annotation {} references missing category {}",
                        ann.id, ann.category_id
                    ),
                )
            })?;
            let class = class_refs
                .get(category.supercategory.as_str())
                .ok_or_else(|| {
                    invalid(
                        export_dir,
                        format!("no object class for '{}'", category.supercategory),
                    )
                })?;

            let properties = if class.typed {
                vec![ObjectProperty {
                    property_type: PROPERTY_TYPE_CHECKBOX.to_string(),
                    property_id: json!(class.id),
                    property_name: type_property_name(&category.supercategory),
                    option_names: vec![category.name.clone()],
                }]
            } else {
                Vec::new()
            };

            let (x, y, width, height) = ann.bbox.to_xywh();
            objects.push(SuperbObject {
                id: json!(ann.id.as_u64()),
                class_id: json!(class.id),
                class_name: category.supercategory.clone(),
                annotation_type: Some(ANNOTATION_TYPE_BOX.to_string()),
                annotation: Some(ObjectAnnotation {
                    coord: BoxCoord {
                        x,
                        y,
                        width,
                        height,
                    },
                    meta: Some(AnnotationMeta {
                        z_index,
                        visible: true,
                        alpha: 1.0,
                        color: colors.get(&category.id).cloned().unwrap_or_default(),
                    }),
                }),
                frames: Vec::new(),
                properties,
            });
        }

        let meta = SuperbMeta {
            data_key: format!("{}/{}", IMAGE_DIR, image.file_name),
            dataset: Some(dataset.info.name.clone()),
            image_info: Some(ImageInfo {
                width: image.width,
                height: image.height,
            }),
            label_id: json!(image_id),
            label_path: vec![label_file.clone()],
            last_updated_date: Some(updated.clone()),
            tags: Vec::new(),
            work_assignee: Some(opts.work_assignee.clone()),
            status: Some(opts.status.clone()),
            frames: Vec::new(),
        };

        assets.push(ExportAsset {
            file_name: image.file_name.clone(),
            label_file,
            meta,
            label: SuperbLabel { objects },
        });
    }

    if let Some((image_id, _)) = annotations_by_image.into_iter().next() {
        return Err(invalid(
            export_dir,
            format!("annotations reference missing image {}", image_id),
        ));
    }

    Ok(SuperbExport { project, assets })
}

/// `count` colors as `#RRGGBB` with uppercase hex digits.
fn random_color_codes(count: usize, seed: Option<u64>) -> Vec<String> {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        draw_color_codes(&mut rng, count)
    } else {
        let mut rng = rand::rng();
        draw_color_codes(&mut rng, count)
    }
}

fn draw_color_codes<R: RngExt + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let [red, green, blue]: [u8; 3] = [rng.random(), rng.random(), rng.random()];
            format!("#{:02X}{:02X}{:02X}", red, green, blue)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

//! Arguments and resolved contexts for the hub's train, inference and
//! export runs.
//!
//! `*Args` hold what a caller asks for, with the usual defaults. The hub
//! resolves them into `*Context` values (device strings expanded, sizes
//! filled from `train.yaml`) before any backend hook sees them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::config::{ImageSize, TrainConfig};

/// `"cpu"` stays as is; anything else is a CUDA device index.
pub fn resolve_device(device: &str) -> String {
    if device == "cpu" {
        device.to_string()
    } else {
        format!("cuda:{device}")
    }
}

#[derive(Clone, Debug)]
pub struct TrainArgs {
    /// Dataset to train on, as exported for the backend.
    pub dataset_path: PathBuf,
    pub epochs: u32,
    pub batch_size: u32,
    pub image_size: ImageSize,
    pub letter_box: bool,
    pub pretrained_model: Option<String>,
    /// `"cpu"` or a GPU index such as `"0"`.
    pub device: String,
    pub workers: u32,
    pub seed: u64,
    pub verbose: bool,
}

impl TrainArgs {
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        epochs: u32,
        batch_size: u32,
        image_size: impl Into<ImageSize>,
    ) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            epochs,
            batch_size,
            image_size: image_size.into(),
            letter_box: false,
            pretrained_model: None,
            device: "0".to_string(),
            workers: 2,
            seed: 0,
            verbose: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainContext {
    pub dataset_path: PathBuf,
    pub epochs: u32,
    pub batch_size: u32,
    pub image_size: ImageSize,
    pub letter_box: bool,
    pub pretrained_model: Option<String>,
    pub device: String,
    pub workers: u32,
    pub seed: u64,
    pub verbose: bool,
}

impl From<TrainArgs> for TrainContext {
    fn from(args: TrainArgs) -> Self {
        Self {
            dataset_path: args.dataset_path,
            epochs: args.epochs,
            batch_size: args.batch_size,
            image_size: args.image_size,
            letter_box: args.letter_box,
            pretrained_model: args.pretrained_model,
            device: resolve_device(&args.device),
            workers: args.workers,
            seed: args.seed,
            verbose: args.verbose,
        }
    }
}

impl TrainContext {
    /// The subset persisted as `train.yaml`.
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            image_size: self.image_size,
            letter_box: self.letter_box,
            batch_size: self.batch_size,
            pretrained_model: self.pretrained_model.clone(),
            seed: self.seed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct InferenceArgs {
    /// An image file or a directory of images.
    pub source: PathBuf,
    pub recursive: bool,
    /// `None` reuses the training size.
    pub image_size: Option<ImageSize>,
    /// `None` reuses the training setting.
    pub letter_box: Option<bool>,
    pub batch_size: u32,
    pub confidence_threshold: f64,
    pub iou_threshold: f64,
    pub half: bool,
    pub workers: u32,
    pub device: String,
    pub draw: bool,
}

impl InferenceArgs {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            recursive: true,
            image_size: None,
            letter_box: None,
            batch_size: 4,
            confidence_threshold: 0.25,
            iou_threshold: 0.5,
            half: false,
            workers: 2,
            device: "0".to_string(),
            draw: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InferenceContext {
    pub source: PathBuf,
    pub recursive: bool,
    pub image_size: ImageSize,
    pub letter_box: bool,
    pub batch_size: u32,
    pub confidence_threshold: f64,
    pub iou_threshold: f64,
    pub half: bool,
    pub workers: u32,
    pub device: String,
    pub draw: bool,
    /// Where the backend writes results.
    pub output_dir: PathBuf,
}

impl InferenceContext {
    pub(crate) fn resolve(args: InferenceArgs, train: &TrainConfig, output_dir: PathBuf) -> Self {
        Self {
            source: args.source,
            recursive: args.recursive,
            image_size: args.image_size.unwrap_or(train.image_size),
            letter_box: args.letter_box.unwrap_or(train.letter_box),
            batch_size: args.batch_size,
            confidence_threshold: args.confidence_threshold,
            iou_threshold: args.iou_threshold,
            half: args.half,
            workers: args.workers,
            device: resolve_device(&args.device),
            draw: args.draw,
            output_dir,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExportArgs {
    /// `None` reuses the training size.
    pub image_size: Option<ImageSize>,
    pub batch_size: u32,
    pub opset_version: u32,
}

impl Default for ExportArgs {
    fn default() -> Self {
        Self {
            image_size: None,
            batch_size: 1,
            opset_version: 11,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportContext {
    /// `[height, width]` of the dummy input.
    pub image_size: [u32; 2],
    pub batch_size: u32,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub opset_version: u32,
    pub onnx_file: PathBuf,
}

impl ExportContext {
    /// Every input and output gets a dynamic batch axis at index 0.
    pub fn dynamic_axes(&self) -> BTreeMap<String, BTreeMap<usize, String>> {
        self.input_names
            .iter()
            .chain(&self.output_names)
            .map(|name| {
                (
                    name.clone(),
                    BTreeMap::from([(0, "batch_size".to_string())]),
                )
            })
            .collect()
    }

    /// Shape of the dummy input tensor: `[batch, 3, height, width]`.
    pub fn input_shape(&self) -> [u32; 4] {
        let [height, width] = self.image_size;
        [self.batch_size, 3, height, width]
    }
}

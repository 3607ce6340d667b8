//! Hub configuration files: `configs/model.yaml` and `configs/train.yaml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WaffleError;
use crate::ir::io_util::{read_yaml, write_yaml};
use crate::ir::{Category, TaskType, DEFAULT_SUPERCATEGORY};

/// One class a model predicts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ClassEntry")]
pub struct ClassSpec {
    pub supercategory: String,
    pub name: String,
}

impl ClassSpec {
    /// A class under the default `"object"` supercategory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            supercategory: DEFAULT_SUPERCATEGORY.to_string(),
            name: name.into(),
        }
    }

    pub fn with_supercategory(name: impl Into<String>, supercategory: impl Into<String>) -> Self {
        Self {
            supercategory: supercategory.into(),
            name: name.into(),
        }
    }
}

impl From<&Category> for ClassSpec {
    fn from(category: &Category) -> Self {
        Self::with_supercategory(category.name.clone(), category.supercategory.clone())
    }
}

/// `model.yaml` accepts either bare class names or full entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassEntry {
    Name(String),
    Full {
        #[serde(default)]
        supercategory: Option<String>,
        name: String,
    },
}

impl From<ClassEntry> for ClassSpec {
    fn from(entry: ClassEntry) -> Self {
        match entry {
            ClassEntry::Name(name) => ClassSpec::new(name),
            ClassEntry::Full {
                supercategory: Some(supercategory),
                name,
            } => ClassSpec::with_supercategory(name, supercategory),
            ClassEntry::Full {
                supercategory: None,
                name,
            } => ClassSpec::new(name),
        }
    }
}

/// Persisted as `configs/model.yaml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub backend: String,
    pub version: String,
    pub task: TaskType,
    pub model_type: String,
    pub model_size: String,
    pub classes: Vec<ClassSpec>,
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self, WaffleError> {
        read_yaml(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), WaffleError> {
        write_yaml(path, self)
    }
}

/// Training input size: a square side or an explicit `[height, width]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSize {
    Square(u32),
    HeightWidth([u32; 2]),
}

impl ImageSize {
    /// `[height, width]`.
    pub fn to_hw(self) -> [u32; 2] {
        match self {
            ImageSize::Square(side) => [side, side],
            ImageSize::HeightWidth(hw) => hw,
        }
    }
}

impl From<u32> for ImageSize {
    fn from(side: u32) -> Self {
        ImageSize::Square(side)
    }
}

/// Persisted as `configs/train.yaml` when training starts. Inference and
/// export fall back to it for unset options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub image_size: ImageSize,
    pub letter_box: bool,
    pub batch_size: u32,
    #[serde(default)]
    pub pretrained_model: Option<String>,
    pub seed: u64,
}

impl TrainConfig {
    pub fn load(path: &Path) -> Result<Self, WaffleError> {
        read_yaml(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), WaffleError> {
        write_yaml(path, self)
    }
}

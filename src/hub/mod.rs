//! Model hub: a named directory holding one model's configs, checkpoints,
//! predictions and exports, plus the train / inference / export sequencing
//! around a [`Backend`].
//!
//! ```text
//! <root_dir>/<name>/
//!   configs/model.yaml     ModelConfig, written on creation
//!   configs/train.yaml     TrainConfig, written when training starts
//!   artifacts/             raw backend training output
//!   weights/best_ckpt.pt   required before inference or export
//!   weights/last_ckpt.pt
//!   weights/model.onnx     export target
//!   metrics.csv
//!   inferences/ evaluations/ exports/
//! ```

mod backend;
mod config;
mod context;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::WaffleError;
use crate::ir::TaskType;

pub use backend::Backend;
pub use config::{ClassSpec, ImageSize, ModelConfig, TrainConfig};
pub use context::{
    resolve_device, ExportArgs, ExportContext, InferenceArgs, InferenceContext, TrainArgs,
    TrainContext,
};

/// Root directory used when none is given.
pub const DEFAULT_ROOT_DIR: &str = "./hubs";

const ARTIFACT_DIR: &str = "artifacts";
const INFERENCE_DIR: &str = "inferences";
const EVALUATION_DIR: &str = "evaluations";
const EXPORT_DIR: &str = "exports";
const MODEL_CONFIG_FILE: &str = "configs/model.yaml";
const TRAIN_CONFIG_FILE: &str = "configs/train.yaml";
const LAST_CKPT_FILE: &str = "weights/last_ckpt.pt";
const BEST_CKPT_FILE: &str = "weights/best_ckpt.pt";
const METRIC_FILE: &str = "metrics.csv";
const ONNX_FILE: &str = "weights/model.onnx";

const ONNX_INPUT_NAME: &str = "inputs";

/// Everything about a hub except its backend. Hooks receive this.
#[derive(Clone, Debug)]
pub struct HubInfo {
    config: ModelConfig,
    root_dir: PathBuf,
    backend_task: String,
}

impl HubInfo {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn task(&self) -> TaskType {
        self.config.task
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The backend's name for this hub's task.
    pub fn backend_task(&self) -> &str {
        &self.backend_task
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn hub_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.name)
    }

    /// Raw backend output. Its presence blocks re-training.
    pub fn artifact_dir(&self) -> PathBuf {
        self.hub_dir().join(ARTIFACT_DIR)
    }

    pub fn inference_dir(&self) -> PathBuf {
        self.hub_dir().join(INFERENCE_DIR)
    }

    pub fn evaluation_dir(&self) -> PathBuf {
        self.hub_dir().join(EVALUATION_DIR)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.hub_dir().join(EXPORT_DIR)
    }

    pub fn model_config_file(&self) -> PathBuf {
        self.hub_dir().join(MODEL_CONFIG_FILE)
    }

    pub fn train_config_file(&self) -> PathBuf {
        self.hub_dir().join(TRAIN_CONFIG_FILE)
    }

    pub fn best_ckpt_file(&self) -> PathBuf {
        self.hub_dir().join(BEST_CKPT_FILE)
    }

    pub fn last_ckpt_file(&self) -> PathBuf {
        self.hub_dir().join(LAST_CKPT_FILE)
    }

    pub fn metric_file(&self) -> PathBuf {
        self.hub_dir().join(METRIC_FILE)
    }

    pub fn onnx_file(&self) -> PathBuf {
        self.hub_dir().join(ONNX_FILE)
    }
}

/// A model hub driven by backend `B`.
#[derive(Debug)]
pub struct Hub<B> {
    backend: B,
    info: HubInfo,
}

impl<B: Backend> Hub<B> {
    /// Creates a hub and writes its `model.yaml`.
    ///
    /// The task must be in the backend's task map, and the model type and
    /// size must be ones the backend lists.
    pub fn new(
        backend: B,
        name: impl Into<String>,
        task: TaskType,
        model_type: impl Into<String>,
        model_size: impl Into<String>,
        classes: Vec<ClassSpec>,
        root_dir: Option<&Path>,
    ) -> Result<Self, WaffleError> {
        let config = ModelConfig {
            name: name.into(),
            backend: backend.name().to_string(),
            version: backend.version().to_string(),
            task,
            model_type: model_type.into(),
            model_size: model_size.into(),
            classes,
        };
        let hub = Self::with_config(backend, config, root_dir)?;
        hub.info.config.save(&hub.info.model_config_file())?;
        info!(hub = hub.info.name(), path = %hub.info.hub_dir().display(), "created hub");
        Ok(hub)
    }

    /// Opens an existing hub from `<root_dir>/<name>/configs/model.yaml`.
    pub fn load(backend: B, name: &str, root_dir: Option<&Path>) -> Result<Self, WaffleError> {
        let root_dir = root_or_default(root_dir);
        let model_config_file = root_dir.join(name).join(MODEL_CONFIG_FILE);
        if !model_config_file.is_file() {
            return Err(WaffleError::HubNotFound {
                name: name.to_string(),
                path: model_config_file,
            });
        }

        let mut config = ModelConfig::load(&model_config_file)?;
        if config.backend != backend.name() {
            return Err(WaffleError::HubConfigInvalid(format!(
                "hub {} was created with backend {}, not {}",
                name,
                config.backend,
                backend.name()
            )));
        }
        config.name = name.to_string();
        Self::with_config(backend, config, Some(&root_dir))
    }

    /// Creates a new hub named `name` from another hub's `model.yaml`.
    pub fn from_model_config(
        backend: B,
        name: impl Into<String>,
        model_config_file: &Path,
        root_dir: Option<&Path>,
    ) -> Result<Self, WaffleError> {
        let config = ModelConfig::load(model_config_file)?;
        Self::new(
            backend,
            name,
            config.task,
            config.model_type,
            config.model_size,
            config.classes,
            root_dir,
        )
    }

    fn with_config(
        backend: B,
        config: ModelConfig,
        root_dir: Option<&Path>,
    ) -> Result<Self, WaffleError> {
        let backend_task = backend
            .backend_task(config.task)
            .ok_or_else(|| {
                WaffleError::HubConfigInvalid(format!(
                    "{} is not supported with {}",
                    config.task,
                    backend.name()
                ))
            })?
            .to_string();

        check_choice("Model Type", &config.model_type, backend.model_types())?;
        check_choice("Model Size", &config.model_size, backend.model_sizes())?;
        if config.classes.is_empty() {
            return Err(WaffleError::HubConfigInvalid(
                "a hub needs at least one class".to_string(),
            ));
        }

        Ok(Self {
            backend,
            info: HubInfo {
                config,
                root_dir: root_or_default(root_dir),
                backend_task,
            },
        })
    }

    pub fn info(&self) -> &HubInfo {
        &self.info
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn hub_dir(&self) -> PathBuf {
        self.info.hub_dir()
    }

    /// Removes `artifacts/` so the hub can be trained again.
    pub fn delete_artifact(&self) -> Result<(), WaffleError> {
        let dir = self.info.artifact_dir();
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(WaffleError::Io)?;
            debug!(path = %dir.display(), "deleted artifacts");
        }
        Ok(())
    }

    /// Ok when the hub has both `model.yaml` and a best checkpoint.
    pub fn check_train_sanity(&self) -> Result<(), WaffleError> {
        if self.info.model_config_file().is_file() && self.info.best_ckpt_file().is_file() {
            Ok(())
        } else {
            Err(WaffleError::TrainRequired {
                path: self.info.hub_dir(),
            })
        }
    }

    /// Runs training and returns the hub directory.
    pub fn train(&mut self, args: TrainArgs) -> Result<PathBuf, WaffleError> {
        let mut ctx = TrainContext::from(args);

        self.before_train()?;
        self.backend.on_train_start(&self.info, &mut ctx)?;
        self.save_train_config(&ctx)?;
        self.backend.training(&self.info, &mut ctx)?;
        self.backend.on_train_end(&self.info, &mut ctx)?;
        self.backend.after_train(&self.info, &mut ctx)?;

        info!(hub = self.info.name(), epochs = ctx.epochs, "training finished");
        Ok(self.info.hub_dir())
    }

    fn before_train(&self) -> Result<(), WaffleError> {
        let dir = self.info.artifact_dir();
        if dir.exists() {
            return Err(WaffleError::ArtifactExists { path: dir });
        }
        Ok(())
    }

    fn save_train_config(&self, ctx: &TrainContext) -> Result<(), WaffleError> {
        ctx.train_config().save(&self.info.train_config_file())
    }

    fn load_train_config(&self) -> Result<TrainConfig, WaffleError> {
        TrainConfig::load(&self.info.train_config_file())
    }

    /// Runs inference and returns the inference directory.
    pub fn inference(&mut self, args: InferenceArgs) -> Result<PathBuf, WaffleError> {
        self.check_train_sanity()?;
        let train = self.load_train_config()?;
        let output_dir = self.info.inference_dir();
        let mut ctx = InferenceContext::resolve(args, &train, output_dir.clone());
        fs::create_dir_all(&output_dir).map_err(WaffleError::Io)?;

        self.backend.on_inference_start(&self.info, &mut ctx)?;
        self.backend.inferencing(&self.info, &mut ctx)?;
        self.backend.on_inference_end(&self.info, &mut ctx)?;
        self.backend.after_inference(&self.info, &mut ctx)?;

        info!(hub = self.info.name(), source = %ctx.source.display(), "inference finished");
        Ok(output_dir)
    }

    /// Exports the best checkpoint to ONNX and returns the `.onnx` path.
    pub fn export(&mut self, args: ExportArgs) -> Result<PathBuf, WaffleError> {
        self.check_train_sanity()?;
        let train = self.load_train_config()?;

        let output_names = onnx_output_names(self.info.task())?;
        let ctx = ExportContext {
            image_size: args.image_size.unwrap_or(train.image_size).to_hw(),
            batch_size: args.batch_size,
            input_names: vec![ONNX_INPUT_NAME.to_string()],
            output_names,
            opset_version: args.opset_version,
            onnx_file: self.info.onnx_file(),
        };
        if let Some(parent) = ctx.onnx_file.parent() {
            fs::create_dir_all(parent).map_err(WaffleError::Io)?;
        }

        self.backend.export_onnx(&self.info, &ctx)?;
        if !ctx.onnx_file.is_file() {
            return Err(WaffleError::Backend {
                backend: self.backend.name().to_string(),
                message: format!("export did not produce {}", ctx.onnx_file.display()),
            });
        }

        info!(hub = self.info.name(), path = %ctx.onnx_file.display(), "exported onnx");
        Ok(ctx.onnx_file)
    }
}

fn root_or_default(root_dir: Option<&Path>) -> PathBuf {
    root_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR))
}

fn check_choice(kind: &str, value: &str, choices: &[&str]) -> Result<(), WaffleError> {
    if choices.contains(&value) {
        Ok(())
    } else {
        Err(WaffleError::HubConfigInvalid(format!(
            "{} {} is not supported. Choose one of {:?}",
            kind, value, choices
        )))
    }
}

/// ONNX output tensor names for a task.
pub fn onnx_output_names(task: TaskType) -> Result<Vec<String>, WaffleError> {
    let names: &[&str] = match task {
        TaskType::ObjectDetection => &["bbox", "conf", "class_id"],
        TaskType::Classification => &["predictions"],
        other => {
            return Err(WaffleError::UnsupportedTask {
                task: other.to_string(),
                operation: "export".to_string(),
            })
        }
    };
    Ok(names.iter().map(|name| name.to_string()).collect())
}

//! The seam between the hub and a training framework.

use super::context::{ExportContext, InferenceContext, TrainContext};
use super::HubInfo;
use crate::error::WaffleError;
use crate::ir::TaskType;

/// A training framework the hub drives.
///
/// The hub owns directories, config files and hook ordering. A backend owns
/// the model: it trains into `hub.artifact_dir()`, leaves checkpoints at
/// `hub.best_ckpt_file()` / `hub.last_ckpt_file()`, writes predictions under
/// the inference context's `output_dir`, and serializes the ONNX graph.
///
/// Lifecycle hooks default to no-ops.
pub trait Backend {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Tasks this backend supports, with the backend's own name for each.
    fn task_map(&self) -> &[(TaskType, &str)];

    fn model_types(&self) -> &[&str];

    fn model_sizes(&self) -> &[&str];

    fn on_train_start(
        &mut self,
        _hub: &HubInfo,
        _ctx: &mut TrainContext,
    ) -> Result<(), WaffleError> {
        Ok(())
    }

    fn training(&mut self, hub: &HubInfo, ctx: &mut TrainContext) -> Result<(), WaffleError>;

    fn on_train_end(&mut self, _hub: &HubInfo, _ctx: &mut TrainContext) -> Result<(), WaffleError> {
        Ok(())
    }

    fn after_train(&mut self, _hub: &HubInfo, _ctx: &mut TrainContext) -> Result<(), WaffleError> {
        Ok(())
    }

    fn on_inference_start(
        &mut self,
        _hub: &HubInfo,
        _ctx: &mut InferenceContext,
    ) -> Result<(), WaffleError> {
        Ok(())
    }

    fn inferencing(
        &mut self,
        hub: &HubInfo,
        ctx: &mut InferenceContext,
    ) -> Result<(), WaffleError>;

    fn on_inference_end(
        &mut self,
        _hub: &HubInfo,
        _ctx: &mut InferenceContext,
    ) -> Result<(), WaffleError> {
        Ok(())
    }

    fn after_inference(
        &mut self,
        _hub: &HubInfo,
        _ctx: &mut InferenceContext,
    ) -> Result<(), WaffleError> {
        Ok(())
    }

    /// Writes the model graph to `ctx.onnx_file`.
    fn export_onnx(&mut self, hub: &HubInfo, ctx: &ExportContext) -> Result<(), WaffleError>;

    /// The backend's task name for `task`, if supported.
    fn backend_task(&self, task: TaskType) -> Option<&str> {
        self.task_map()
            .iter()
            .find(|(supported, _)| *supported == task)
            .map(|(_, name)| *name)
    }
}

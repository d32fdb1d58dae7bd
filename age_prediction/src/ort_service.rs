use crate::{
    model_service::{AgeModel, InferenceError},
    registry::RegistryError,
};
use ndarray::{ArrayView4, CowArray, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{path::Path, sync::Mutex};

/// Borrows `input` when it is already contiguous, copies it otherwise.
fn standard_layout(input: ArrayView4<'_, f32>) -> CowArray<'_, f32, Ix4> {
    if input.is_standard_layout() {
        CowArray::from(input)
    } else {
        CowArray::from(input.to_owned())
    }
}

fn build_session(path: &Path, intra_threads: usize) -> ort::Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(path)
}

/// ONNX Runtime session producing a single scalar per image.
pub struct OrtAgeModel {
    name: String,
    session: Mutex<Session>,
    output_name: String,
}

impl OrtAgeModel {
    pub fn load(path: &Path, intra_threads: usize) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Err(RegistryError::NotFound(path.to_path_buf()));
        }

        let session = build_session(path, intra_threads).map_err(|e| RegistryError::Session {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| RegistryError::NoOutput(path.to_path_buf()))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(model = %name, output = %output_name, "Loaded ONNX session");

        Ok(Self {
            name,
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl AgeModel for OrtAgeModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<f32, InferenceError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Poisoned(e.to_string()))?;

        let input = standard_layout(input);

        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| InferenceError::Tensor(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        let (_shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Extract(e.to_string()))?;

        data.first()
            .copied()
            .ok_or_else(|| InferenceError::EmptyOutput(self.name.clone()))
    }
}

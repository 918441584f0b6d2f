use std::path::{Path, PathBuf};

use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};
use parking_lot::Mutex;

use crate::{
    codec::INPUT_SHAPE,
    errors::{NeuralStyleError, Result},
    traits::InferenceEngine,
};

/// Options for building an [`OnnxSession`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub device_id: i32,
    /// Intra-op thread count; `None` leaves the runtime default.
    pub threads: Option<usize>,
}

/// A loaded style graph together with its input and output slot names.
pub struct OnnxSession {
    path: PathBuf,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl OnnxSession {
    pub fn load(model_path: &Path, options: SessionOptions) -> Result<Self> {
        let load_error = |stage: &str, err: ort::Error| NeuralStyleError::ArtifactLoadFailed {
            path: model_path.to_path_buf(),
            reason: format!("{stage}: {err}"),
        };

        let mut builder = SessionBuilder::new()
            .map_err(|e| load_error("session builder", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(options.device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(options.device_id)
                    .build(),
            ])
            .map_err(|e| load_error("execution providers", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error("optimization level", e))?
            .with_memory_pattern(true)
            .map_err(|e| load_error("memory pattern", e))?;
        if let Some(threads) = options.threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| load_error("intra-op threads", e))?;
        }
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| load_error("commit", e))?;

        if session.inputs.len() != 1 || session.outputs.len() != 1 {
            return Err(NeuralStyleError::ArtifactLoadFailed {
                path: model_path.to_path_buf(),
                reason: format!(
                    "expected one input and one output, found {} and {}",
                    session.inputs.len(),
                    session.outputs.len()
                ),
            });
        }
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();

        let model = Self {
            path: model_path.to_path_buf(),
            input_name,
            output_name,
            session: Mutex::new(session),
        };

        // warm up
        let data = Array4::<f32>::zeros(INPUT_SHAPE);
        model
            .infer(data.view())
            .map_err(|e| NeuralStyleError::ArtifactLoadFailed {
                path: model_path.to_path_buf(),
                reason: format!("warm-up run: {e}"),
            })?;

        tracing::info!(
            path = %model.path.display(),
            input = %model.input_name,
            output = %model.output_name,
            "inference session ready"
        );
        Ok(model)
    }
}

impl InferenceEngine for OnnxSession {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let input = input.as_standard_layout();
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&input)?
        ])?;
        let output = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned();
        Ok(output)
    }
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("path", &self.path)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

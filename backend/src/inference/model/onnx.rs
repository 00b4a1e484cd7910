use std::path::Path;
use std::sync::Mutex;

use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

use super::Classifier;
use crate::inference::error::{InferenceError, LoadError};
use crate::inference::preprocess::ImageTensor;

/// ONNX export of the trained network (e.g. `tf2onnx` from the Keras model),
/// taking NHWC float input.
///
/// `Session::run` needs `&mut self`, so calls are serialized.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

fn load_failed(e: impl std::fmt::Display) -> LoadError {
    LoadError::Backend(e.to_string())
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let session = Session::builder()
            .map_err(load_failed)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_failed)?
            .with_intra_threads(4)
            .map_err(load_failed)?
            .commit_from_file(path)
            .map_err(load_failed)?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| LoadError::Backend("model declares no inputs".into()))?;
        let output_name = session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or_else(|| LoadError::Backend("model declares no outputs".into()))?;

        log::info!(
            "ONNX model loaded from {} (input '{}', output '{}')",
            path.display(),
            input_name,
            output_name
        );
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let backend_err = |e: ort::Error| InferenceError::Backend(e.to_string());

        let input = TensorRef::from_array_view(tensor.as_array().view())
            .map_err(backend_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Backend("model lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(backend_err)?;

        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(backend_err)?;
        Ok(scores.iter().copied().collect())
    }
}

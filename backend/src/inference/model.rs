use std::path::Path;
use std::sync::Arc;

use super::error::{InferenceError, LoadError};
use super::preprocess::ImageTensor;

/// Backend that turns a preprocessed tensor into per-class scores.
///
/// Implementations must be deterministic and safe to call from several
/// request workers at once.
pub trait Classifier: Send + Sync {
    fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

/// Model loaded once at startup. Never swapped afterwards.
#[derive(Clone)]
pub enum ClassifierHandle {
    Loaded(Arc<dyn Classifier>),
    Unavailable { reason: String },
}

impl ClassifierHandle {
    /// Loads the artifact at `path`. A failure is logged and leaves the handle
    /// unavailable instead of aborting startup.
    pub fn load(path: &Path) -> Self {
        match load_backend(path) {
            Ok(classifier) => {
                log::info!("Model loaded successfully from {}", path.display());
                ClassifierHandle::Loaded(classifier)
            }
            Err(e) => {
                log::error!(
                    "Error loading model from {}: {}. Prediction requests will fail until restart.",
                    path.display(),
                    e
                );
                ClassifierHandle::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn from_classifier(classifier: impl Classifier + 'static) -> Self {
        ClassifierHandle::Loaded(Arc::new(classifier))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ClassifierHandle::Loaded(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ClassifierHandle::Loaded(_) => None,
            ClassifierHandle::Unavailable { reason } => Some(reason),
        }
    }

    pub fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        match self {
            ClassifierHandle::Unavailable { .. } => Err(InferenceError::ModelUnavailable),
            ClassifierHandle::Loaded(classifier) => {
                tensor.check_shape()?;
                classifier.predict(tensor)
            }
        }
    }
}

fn check_artifact(path: &Path) -> Result<(), LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.display().to_string()));
    }
    Ok(())
}

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "torch")]
mod torch;

/// Picks the backend from the artifact extension.
fn load_backend(path: &Path) -> Result<Arc<dyn Classifier>, LoadError> {
    check_artifact(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        #[cfg(feature = "onnx")]
        "onnx" => Ok(Arc::new(onnx::OnnxClassifier::load(path)?)),
        #[cfg(feature = "torch")]
        "pt" | "pth" => Ok(Arc::new(torch::TorchClassifier::load(path)?)),
        _ => Err(LoadError::UnsupportedArtifact(path.display().to_string())),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inference::preprocess::INPUT_SHAPE;
    use ndarray::Array4;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed vector and counts how often it was asked.
    pub struct StubClassifier {
        pub output: Vec<f32>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StubClassifier {
        pub fn new(output: Vec<f32>) -> Self {
            Self {
                output,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Classifier for StubClassifier {
        fn predict(&self, _tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    /// Sums the tensor so different inputs give different outputs.
    struct SumClassifier;

    impl Classifier for SumClassifier {
        fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            let total: f32 = tensor.as_array().sum();
            Ok(vec![total, total / 2.0, 1.0, 0.0])
        }
    }

    #[test]
    fn unavailable_handle_fails_fast() {
        let handle = ClassifierHandle::Unavailable {
            reason: "missing".into(),
        };
        let tensor = ImageTensor::new(Array4::zeros(INPUT_SHAPE));
        assert!(!handle.is_available());
        assert_eq!(handle.unavailable_reason(), Some("missing"));
        assert!(matches!(
            handle.predict(&tensor),
            Err(InferenceError::ModelUnavailable)
        ));
    }

    #[test]
    fn missing_artifact_leaves_handle_unavailable() {
        let handle = ClassifierHandle::load(Path::new("/nonexistent/model.pt"));
        assert!(!handle.is_available());
        assert!(handle.unavailable_reason().unwrap().contains("not found"));
    }

    #[test]
    fn unknown_artifact_extension_is_unsupported() {
        let path = std::env::temp_dir().join(format!("scan-{}.h5", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"keras weights").unwrap();

        let result = load_backend(&path);
        let handle = ClassifierHandle::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(LoadError::UnsupportedArtifact(_))));
        assert!(!handle.is_available());
        assert!(handle.unavailable_reason().unwrap().contains("No inference backend"));
    }

    #[test]
    fn shape_is_checked_before_backend_call() {
        let stub = StubClassifier::new(vec![0.25; 4]);
        let calls = stub.calls.clone();
        let handle = ClassifierHandle::from_classifier(stub);
        let tensor = ImageTensor::new(Array4::zeros((1, 3, 224, 224)));
        assert!(matches!(
            handle.predict(&tensor),
            Err(InferenceError::ShapeMismatch { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn predict_is_deterministic() {
        let handle = ClassifierHandle::from_classifier(SumClassifier);
        let tensor = ImageTensor::new(Array4::from_elem(INPUT_SHAPE, 0.5));
        let first = handle.predict(&tensor).unwrap();
        let second = handle.predict(&tensor.clone()).unwrap();
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn handle_is_shared_across_threads() {
        let handle = ClassifierHandle::from_classifier(SumClassifier);
        let tensor = ImageTensor::new(Array4::zeros(INPUT_SHAPE));
        let results: Vec<Vec<f32>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| handle.predict(&tensor).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }
}

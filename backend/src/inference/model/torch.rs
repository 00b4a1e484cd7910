use std::path::Path;
use std::sync::Mutex;

use tch::{CModule, Device, Kind, Tensor, nn::ModuleT};

use super::Classifier;
use crate::inference::error::{InferenceError, LoadError};
use crate::inference::preprocess::{ImageTensor, INPUT_SHAPE};

/// TorchScript export of the trained network, taking NHWC float input.
///
/// `CModule` is not `Sync`, so forward passes are serialized.
pub struct TorchClassifier {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchClassifier {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(path, device)
            .map_err(|e| LoadError::Backend(e.to_string()))?;
        module.set_eval();
        log::info!("TorchScript module placed on {:?}", device);
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }
}

impl Classifier for TorchClassifier {
    fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let shape = INPUT_SHAPE.map(|d| d as i64);
        let values = tensor.to_vec();
        let input = Tensor::from_slice(values.as_slice())
            .view(shape)
            .to_device(self.device);

        let module = self
            .module
            .lock()
            .map_err(|_| InferenceError::Backend("model lock poisoned".into()))?;
        let output = tch::no_grad(|| module.forward_t(&input, false));

        let output_flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        Vec::<f32>::try_from(&output_flat).map_err(|e| InferenceError::Backend(e.to_string()))
    }
}

use image::error::{ImageError, LimitError, LimitErrorKind};
use image::imageops::{self, FilterType};
use ndarray::Array4;

use super::error::InferenceError;

pub const INPUT_SIZE: u32 = 224;
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3];

/// An uploaded file as received from the client.
#[derive(Debug, Clone, Default)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl RawUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// NHWC batch of one image, channel values scaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array4<f32>);

impl ImageTensor {
    pub fn new(array: Array4<f32>) -> Self {
        Self(array)
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn check_shape(&self) -> Result<(), InferenceError> {
        if self.shape() != INPUT_SHAPE {
            return Err(InferenceError::ShapeMismatch {
                actual: self.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Values in row-major NHWC order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.as_array().iter().copied().collect()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    filter: FilterType,
}

impl ImagePreprocessor {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Decode, force RGB, resize to 224x224 with the pinned filter, scale to
    /// `[0, 1]` and add the batch axis. Steps run in exactly this order.
    pub fn preprocess(&self, raw: &RawUpload) -> Result<ImageTensor, InferenceError> {
        if raw.is_empty() {
            return Err(InferenceError::EmptyInput);
        }

        let image = image::load_from_memory(&raw.bytes)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(InferenceError::Decode(ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::DimensionError,
            ))));
        }
        log::debug!(
            "Decoded upload {} ({}): {}x{} {:?}",
            raw.file_name.as_deref().unwrap_or("<unnamed>"),
            raw.content_type.as_deref().unwrap_or("unknown type"),
            image.width(),
            image.height(),
            image.color()
        );

        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, self.filter);

        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|value| value as f32 / 255.0)
            .collect();
        let len = data.len();
        let array = Array4::from_shape_vec(INPUT_SHAPE, data)
            .map_err(|_| InferenceError::ShapeMismatch { actual: vec![len] })?;

        Ok(ImageTensor::new(array))
    }
}

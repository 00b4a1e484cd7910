use shared::{ClassLabel, InferenceResponse};

use super::error::InferenceError;
use super::labels::{argmax, map_label};
use super::model::ClassifierHandle;
use super::preprocess::{ImagePreprocessor, RawUpload};

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    pub label: ClassLabel,
    pub predictions: Vec<f32>,
    pub confidence: f32,
}

impl InferenceOutcome {
    pub fn into_response(self) -> InferenceResponse {
        InferenceResponse {
            label: self.label,
            prediction: self.label,
            predictions: self.predictions,
            class_labels: ClassLabel::class_names(),
            confidence: self.confidence,
        }
    }
}

/// Runs one upload through preprocess, classify and label mapping.
///
/// Each call is independent; nothing is retried or queued.
pub struct InferenceService {
    preprocessor: ImagePreprocessor,
    classifier: ClassifierHandle,
}

impl InferenceService {
    pub fn new(preprocessor: ImagePreprocessor, classifier: ClassifierHandle) -> Self {
        Self {
            preprocessor,
            classifier,
        }
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    pub fn infer(&self, raw: RawUpload) -> Result<InferenceOutcome, InferenceError> {
        let result = self.run(raw);
        if let Err(e) = &result {
            if e.is_user_error() {
                log::warn!("Rejected upload: {}", e);
            } else {
                log::error!("Inference failed: {}", e);
            }
        }
        result
    }

    fn run(&self, raw: RawUpload) -> Result<InferenceOutcome, InferenceError> {
        log::debug!("Received upload of {} bytes", raw.bytes.len());
        if raw.is_empty() {
            return Err(InferenceError::EmptyInput);
        }
        if !self.classifier.is_available() {
            return Err(InferenceError::ModelUnavailable);
        }

        log::debug!("Preprocessing upload");
        let tensor = self.preprocessor.preprocess(&raw)?;
        drop(raw);

        log::debug!("Classifying tensor {:?}", tensor.shape());
        let predictions = self.classifier.predict(&tensor)?;

        log::debug!("Mapping predictions {:?}", predictions);
        let label = map_label(&predictions);
        let confidence = if label.is_known() {
            argmax(&predictions).map_or(0.0, |index| predictions[index])
        } else {
            log::warn!(
                "Model returned {} values for {} classes, reporting Unknown",
                predictions.len(),
                ClassLabel::TABLE.len()
            );
            0.0
        };

        Ok(InferenceOutcome {
            label,
            predictions,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::tests::StubClassifier;
    use image::imageops::FilterType;
    use image::{DynamicImage, GrayImage, ImageFormat};
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    fn black_scan() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::new(100, 50))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn service_with(stub: StubClassifier) -> InferenceService {
        InferenceService::new(
            ImagePreprocessor::new(FilterType::Nearest),
            ClassifierHandle::from_classifier(stub),
        )
    }

    #[test]
    fn black_scan_is_classified_very_mild() {
        let service = service_with(StubClassifier::new(vec![0.1, 0.7, 0.1, 0.1]));
        let outcome = service.infer(RawUpload::new(black_scan())).unwrap();
        assert_eq!(outcome.label, ClassLabel::VeryMildDemented);
        assert_eq!(outcome.confidence, 0.7);
        assert_eq!(outcome.predictions, vec![0.1, 0.7, 0.1, 0.1]);

        let response = outcome.into_response();
        assert_eq!(response.class_labels[1], "VeryMildDemented");
        assert_eq!(response.prediction, response.label);
    }

    #[test]
    fn empty_upload_never_reaches_classifier() {
        let stub = StubClassifier::new(vec![0.1, 0.7, 0.1, 0.1]);
        let calls = stub.calls.clone();
        let service = service_with(stub);
        let err = service.infer(RawUpload::default()).unwrap_err();
        assert!(matches!(err, InferenceError::EmptyInput));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unavailable_model_fails_before_decoding() {
        let service = InferenceService::new(
            ImagePreprocessor::new(FilterType::Nearest),
            ClassifierHandle::Unavailable {
                reason: "load failed".into(),
            },
        );
        // Garbage bytes would be a decode error if preprocessing ran first.
        let err = service
            .infer(RawUpload::new(b"not an image".to_vec()))
            .unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable));
    }

    #[test]
    fn undecodable_upload_is_decode_error() {
        let stub = StubClassifier::new(vec![0.1, 0.7, 0.1, 0.1]);
        let calls = stub.calls.clone();
        let service = service_with(stub);
        let err = service
            .infer(RawUpload::new(b"GIF89a garbage".to_vec()))
            .unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mismatched_model_output_maps_to_unknown() {
        let service = service_with(StubClassifier::new(vec![0.1, 0.1, 0.1, 0.1, 0.6]));
        let outcome = service.infer(RawUpload::new(black_scan())).unwrap();
        assert_eq!(outcome.label, ClassLabel::Unknown);
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.predictions.len(), 5);
    }
}

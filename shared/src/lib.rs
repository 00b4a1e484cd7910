use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Severity classes produced by the scan classifier.
///
/// The index order of [`ClassLabel::TABLE`] is the class order the model was
/// trained with. Reordering it silently changes every prediction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ClassLabel {
    MildDemented,
    VeryMildDemented,
    ModerateDemented,
    NonDemented,
    /// Model output did not line up with the label table.
    Unknown,
}

impl ClassLabel {
    pub const TABLE: [ClassLabel; 4] = [
        ClassLabel::MildDemented,
        ClassLabel::VeryMildDemented,
        ClassLabel::ModerateDemented,
        ClassLabel::NonDemented,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::TABLE.get(index).copied().unwrap_or(ClassLabel::Unknown)
    }

    pub fn is_known(&self) -> bool {
        *self != ClassLabel::Unknown
    }

    pub fn class_names() -> Vec<String> {
        Self::TABLE.iter().map(|label| label.to_string()).collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InferenceResponse {
    pub label: ClassLabel,
    /// Same value as `label`, kept for clients that read `prediction`.
    pub prediction: ClassLabel,
    pub predictions: Vec<f32>,
    pub class_labels: Vec<String>,
    pub confidence: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

use shared::ClassLabel;

/// Index of the largest value, first occurrence winning ties. NaN never wins.
pub fn argmax(probs: &[f32]) -> Option<usize> {
    probs
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (index, &p)| match best {
            Some((_, top)) if top >= p => best,
            _ => Some((index, p)),
        })
        .map(|(index, _)| index)
}

/// Maps a model output to its label. Outputs that do not have exactly one
/// value per known class map to [`ClassLabel::Unknown`].
pub fn map_label(probs: &[f32]) -> ClassLabel {
    if probs.len() != ClassLabel::TABLE.len() {
        return ClassLabel::Unknown;
    }
    argmax(probs).map_or(ClassLabel::Unknown, ClassLabel::from_index)
}

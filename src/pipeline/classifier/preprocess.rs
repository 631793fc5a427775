//! Image and logit handling shared by every classifier backend.

use image::imageops::FilterType;

use super::ClassifierError;
use crate::models::{DocumentLabel, LabelConfidence};

/// Side length of the square classifier input.
pub const INPUT_SIZE: u32 = 224;

/// Decode `image_bytes` into a `[3, 224, 224]` CHW tensor of RGB values in [0, 1].
pub fn image_to_chw(image_bytes: &[u8]) -> Result<Vec<f32>, ClassifierError> {
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| ClassifierError::InvalidImage(e.to_string()))?;
    let rgb = img.to_rgb8();
    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut chw = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (y * INPUT_SIZE + x) as usize;
        for channel in 0..3 {
            chw[channel * plane + offset] = pixel.0[channel] as f32 / 255.0;
        }
    }
    Ok(chw)
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Argmax of the softmax over the 16 class logits. Ties go to the lower index.
pub fn label_from_logits(logits: &[f32]) -> Result<LabelConfidence, ClassifierError> {
    if logits.len() != DocumentLabel::ALL.len() {
        return Err(ClassifierError::Inference(format!(
            "expected {} logits, got {}",
            DocumentLabel::ALL.len(),
            logits.len()
        )));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(ClassifierError::Inference("non-finite logits".into()));
    }

    let probabilities = softmax(logits);
    let (index, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

    let label = DocumentLabel::from_index(index)
        .ok_or_else(|| ClassifierError::Inference(format!("class index {index} out of range")))?;
    Ok(LabelConfidence::new(label, confidence))
}

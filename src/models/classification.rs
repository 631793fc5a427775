use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentLabel, OverrideReason};

/// A label with its confidence. Confidence is always within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelConfidence {
    pub label: DocumentLabel,
    pub confidence: f32,
}

impl LabelConfidence {
    /// Clamps `confidence` into [0, 1]; NaN becomes 0.
    pub fn new(label: DocumentLabel, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }
}

/// Render a confidence with exactly two decimal digits.
pub fn format_confidence(confidence: f32) -> String {
    format!("{confidence:.2}")
}

/// Final verdict for one request.
///
/// Built once by the orchestrator and handed to the response layer as-is.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub label: DocumentLabel,
    pub confidence: String,
    pub extracted_text: String,
    pub summary: String,
    pub override_reason: OverrideReason,
    pub disagreement: bool,
    pub persisted_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_clamps_out_of_range() {
        assert_eq!(LabelConfidence::new(DocumentLabel::Memo, 1.7).confidence, 1.0);
        assert_eq!(LabelConfidence::new(DocumentLabel::Memo, -0.2).confidence, 0.0);
        assert_eq!(LabelConfidence::new(DocumentLabel::Memo, f32::NAN).confidence, 0.0);
    }

    #[test]
    fn formats_known_values() {
        assert_eq!(format_confidence(0.92), "0.92");
        assert_eq!(format_confidence(0.95), "0.95");
        assert_eq!(format_confidence(1.0), "1.00");
        assert_eq!(format_confidence(0.0), "0.00");
        assert_eq!(format_confidence(0.8765), "0.88");
    }

    proptest! {
        #[test]
        fn formatted_confidence_has_two_decimals(c in 0.0f32..=1.0f32) {
            let text = format_confidence(c);
            let (whole, frac) = text.split_once('.').expect("decimal point");
            prop_assert_eq!(frac.len(), 2);
            prop_assert!(whole == "0" || whole == "1");
            prop_assert!(frac.chars().all(|ch| ch.is_ascii_digit()));
        }
    }
}

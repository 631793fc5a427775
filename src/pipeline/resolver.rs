//! Override policy: decides whether the heuristic, the reasoning service or the
//! résumé fallback replaces the base classifier's label.
//!
//! The heuristic branch and the reasoning branch are mutually exclusive. Once the
//! heuristic names a label different from the base one, reasoning never runs, even
//! when that heuristic label is not allowed to override.

use crate::models::{DocumentLabel, LabelConfidence, OverrideReason};

use super::heuristic::HeuristicDetector;
use super::reasoning::ReasoningOverrideAdapter;

/// Texts this short (in characters) keep the base prediction untouched.
pub const MIN_TEXT_CHARS_FOR_OVERRIDE: usize = 50;

/// Base confidence below which a non-sensitive label yields to the heuristic.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.85;

pub const FALLBACK_RESUME_CONFIDENCE: f32 = 0.95;

const FALLBACK_RESUME_MARKERS: [&str; 2] = ["work experience", "education"];

/// Final label decision for one document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub label: DocumentLabel,
    pub confidence: f32,
    pub reason: OverrideReason,
    pub disagreement: bool,
}

impl Resolution {
    fn from_base(base: LabelConfidence) -> Self {
        Self {
            label: base.label,
            confidence: base.confidence,
            reason: OverrideReason::BaseClassifier,
            disagreement: false,
        }
    }
}

pub struct OverrideResolver {
    heuristic: HeuristicDetector,
    reasoning: ReasoningOverrideAdapter,
}

impl OverrideResolver {
    pub fn new(heuristic: HeuristicDetector, reasoning: ReasoningOverrideAdapter) -> Self {
        Self {
            heuristic,
            reasoning,
        }
    }

    /// Resolve the final label from the base prediction and the normalized OCR text.
    pub fn resolve(&self, base: LabelConfidence, text: &str) -> Resolution {
        let mut resolution = Resolution::from_base(base);

        if text.chars().count() <= MIN_TEXT_CHARS_FOR_OVERRIDE {
            tracing::debug!(label = %base.label, "Text too short for overrides");
            return resolution;
        }

        let base_sensitive = base.label.is_sensitive();

        match self.heuristic.detect(text) {
            Some(candidate) if candidate.label != base.label => {
                if base_sensitive || base.confidence < LOW_CONFIDENCE_THRESHOLD {
                    tracing::info!(
                        from = %base.label,
                        to = %candidate.label,
                        "Heuristic override"
                    );
                    resolution.label = candidate.label;
                    resolution.confidence = candidate.confidence;
                    resolution.reason = OverrideReason::HeuristicOverride;
                    resolution.disagreement = true;
                } else {
                    tracing::debug!(
                        base = %base.label,
                        candidate = %candidate.label,
                        base_confidence = base.confidence,
                        "Heuristic disagrees but base is confident, keeping base; reasoning skipped"
                    );
                }
            }
            _ if base_sensitive => {
                if let Some(verdict) = self.reasoning.classify(text) {
                    if verdict.label != base.label {
                        tracing::info!(
                            from = %base.label,
                            to = %verdict.label,
                            confidence = verdict.confidence,
                            "Reasoning override"
                        );
                        let verdict = LabelConfidence::new(verdict.label, verdict.confidence);
                        resolution.label = verdict.label;
                        resolution.confidence = verdict.confidence;
                        resolution.reason = OverrideReason::ReasoningOverride;
                        resolution.disagreement = true;
                    }
                }
            }
            _ => {}
        }

        if resolution.label == base.label && has_resume_markers(text) {
            tracing::info!(from = %base.label, "Fallback resume detection");
            resolution.label = DocumentLabel::Resume;
            resolution.confidence = FALLBACK_RESUME_CONFIDENCE;
            resolution.reason = OverrideReason::FallbackResumeDetection;
            resolution.disagreement = resolution.label != base.label;
        }

        resolution
    }
}

fn has_resume_markers(text: &str) -> bool {
    let lowered = text.to_lowercase();
    FALLBACK_RESUME_MARKERS
        .iter()
        .all(|marker| lowered.contains(marker))
}

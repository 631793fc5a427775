//! Keyword heuristics over OCR text.
//!
//! Labels are tried in table order and the first one with enough keyword hits wins,
//! even if a later label would match more keywords.

use crate::models::{DocumentLabel, LabelConfidence};

/// Keyword hits a label needs before the heuristic claims it.
pub const KEYWORD_THRESHOLD: usize = 3;

/// Confidence reported for a heuristic match.
pub const HEURISTIC_CONFIDENCE: f32 = 0.95;

const KEYWORD_TABLE: &[(DocumentLabel, &[&str])] = &[
    (
        DocumentLabel::Resume,
        &["work experience", "education", "skills", "certifications", "linkedin"],
    ),
    (
        DocumentLabel::Invoice,
        &["invoice", "amount due", "total", "bill to", "payment terms"],
    ),
    (
        DocumentLabel::Memo,
        &["interoffice memo", "subject:", "to:", "from:", "date:"],
    ),
    (
        DocumentLabel::Email,
        &["subject:", "to:", "from:", "sent:", "cc:"],
    ),
    (
        DocumentLabel::Letter,
        &["dear", "sincerely", "regards", "to whom it may concern"],
    ),
    (
        DocumentLabel::Form,
        &["fill out", "checkbox", "signature", "date", "form number"],
    ),
    (
        DocumentLabel::Questionnaire,
        &["survey", "question", "response", "rate", "agree"],
    ),
    (
        DocumentLabel::Budget,
        &["budget", "fiscal year", "allocation", "expenditure", "forecast"],
    ),
    (
        DocumentLabel::Presentation,
        &["slide", "agenda", "overview", "bullet points", "presentation"],
    ),
    (
        DocumentLabel::NewsArticle,
        &["byline", "headline", "reporter", "press", "breaking news"],
    ),
    (
        DocumentLabel::ScientificPublication,
        &["abstract", "methodology", "results", "references", "doi"],
    ),
    (
        DocumentLabel::ScientificReport,
        &["experiment", "data", "analysis", "conclusion", "report"],
    ),
    (
        DocumentLabel::Specification,
        &["specification", "requirements", "parameters", "dimensions", "test"],
    ),
    (
        DocumentLabel::Advertisement,
        &["sale", "discount", "offer", "limited time", "buy now"],
    ),
    (
        DocumentLabel::FileFolder,
        &["folder", "contents", "index", "file list", "archive"],
    ),
    (
        DocumentLabel::Handwritten,
        &["handwritten", "pen", "ink", "cursive", "scribble"],
    ),
];

/// Stateless keyword matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDetector;

impl HeuristicDetector {
    pub fn new() -> Self {
        Self
    }

    /// First label in table order with at least [`KEYWORD_THRESHOLD`] keyword hits.
    ///
    /// Keywords match as plain substrings of the lower-cased text, so "rate" also
    /// hits "separate".
    pub fn detect(&self, text: &str) -> Option<LabelConfidence> {
        let lowered = text.to_lowercase();
        KEYWORD_TABLE
            .iter()
            .find(|(_, keywords)| {
                keywords.iter().filter(|kw| lowered.contains(*kw)).count() >= KEYWORD_THRESHOLD
            })
            .map(|(label, _)| LabelConfidence::new(*label, HEURISTIC_CONFIDENCE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detect(text: &str) -> Option<DocumentLabel> {
        HeuristicDetector::new().detect(text).map(|lc| lc.label)
    }

    #[test]
    fn table_covers_every_label_once() {
        assert_eq!(KEYWORD_TABLE.len(), DocumentLabel::ALL.len());
        for label in DocumentLabel::ALL {
            assert_eq!(
                KEYWORD_TABLE.iter().filter(|(l, _)| *l == label).count(),
                1,
                "{label} missing or duplicated"
            );
        }
    }

    #[test]
    fn resume_keywords_match() {
        let text = "Work Experience: 5 years. Education: BSc. Skills: Rust, SQL.";
        let hit = HeuristicDetector::new().detect(text).unwrap();
        assert_eq!(hit.label, DocumentLabel::Resume);
        assert_eq!(hit.confidence, 0.95);
    }

    #[test]
    fn two_hits_are_not_enough() {
        assert_eq!(detect("Education and skills matter."), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            detect("INVOICE No. 7 - BILL TO: Acme - AMOUNT DUE: $40"),
            Some(DocumentLabel::Invoice)
        );
    }

    #[test]
    fn first_match_beats_best_match() {
        // Memo reaches 3 via to:/from:/subject:, Email would reach 5. Memo comes first.
        let text = "To: team From: boss Subject: lunch Sent: monday Cc: hr";
        assert_eq!(detect(text), Some(DocumentLabel::Memo));
    }

    #[test]
    fn substring_matches_count() {
        // "rate" inside "separate", "response" inside "responses", "question" inside "questions".
        assert_eq!(
            detect("separate responses to the questions"),
            Some(DocumentLabel::Questionnaire)
        );
    }

    #[test]
    fn letter_needs_three_of_four() {
        assert_eq!(
            detect("Dear Ms. Smith, ... Kind regards and sincerely yours"),
            Some(DocumentLabel::Letter)
        );
    }

    #[test]
    fn empty_text_matches_nothing() {
        assert_eq!(detect(""), None);
    }

    proptest! {
        #[test]
        fn detect_is_pure(text in ".{0,400}") {
            let detector = HeuristicDetector::new();
            prop_assert_eq!(detector.detect(&text), detector.detect(&text));
        }

        #[test]
        fn detect_ignores_case(text in "[a-zA-Z :]{0,200}") {
            let detector = HeuristicDetector::new();
            prop_assert_eq!(
                detector.detect(&text),
                detector.detect(&text.to_uppercase())
            );
        }
    }
}

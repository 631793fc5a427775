use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// RVL-CDIP category names. Declaration order is the classifier's output index order.
str_enum!(DocumentLabel {
    Advertisement => "Advertisement",
    Budget => "Budget",
    Email => "Email",
    FileFolder => "File Folder",
    Form => "Form",
    Handwritten => "Handwritten",
    Invoice => "Invoice",
    Letter => "Letter",
    Memo => "Memo",
    NewsArticle => "News Article",
    Presentation => "Presentation",
    Questionnaire => "Questionnaire",
    Resume => "Resume",
    ScientificPublication => "Scientific Publication",
    ScientificReport => "Scientific Report",
    Specification => "Specification",
});

str_enum!(OverrideReason {
    BaseClassifier => "base_classifier",
    HeuristicOverride => "heuristic_override",
    ReasoningOverride => "reasoning_override",
    FallbackResumeDetection => "fallback_resume_detection",
});

impl DocumentLabel {
    /// All labels, indexed by classifier output position.
    pub const ALL: [DocumentLabel; 16] = [
        Self::Advertisement,
        Self::Budget,
        Self::Email,
        Self::FileFolder,
        Self::Form,
        Self::Handwritten,
        Self::Invoice,
        Self::Letter,
        Self::Memo,
        Self::NewsArticle,
        Self::Presentation,
        Self::Questionnaire,
        Self::Resume,
        Self::ScientificPublication,
        Self::ScientificReport,
        Self::Specification,
    ];

    /// Labels eligible for override scrutiny.
    pub const SENSITIVE: [DocumentLabel; 4] =
        [Self::Resume, Self::Specification, Self::Memo, Self::Letter];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_sensitive(&self) -> bool {
        Self::SENSITIVE.contains(self)
    }

    /// Lenient parse for model output: case-insensitive, `_`/`-` treated as spaces.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let wanted = raw
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == '.')
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().to_lowercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn label_index_order_matches_classifier_head() {
        assert_eq!(DocumentLabel::from_index(0), Some(DocumentLabel::Advertisement));
        assert_eq!(DocumentLabel::from_index(3), Some(DocumentLabel::FileFolder));
        assert_eq!(DocumentLabel::from_index(6), Some(DocumentLabel::Invoice));
        assert_eq!(DocumentLabel::from_index(12), Some(DocumentLabel::Resume));
        assert_eq!(DocumentLabel::from_index(15), Some(DocumentLabel::Specification));
        assert_eq!(DocumentLabel::from_index(16), None);
    }

    #[test]
    fn label_round_trip() {
        for label in DocumentLabel::ALL {
            assert_eq!(DocumentLabel::from_str(label.as_str()).unwrap(), label);
        }
    }

    #[test]
    fn sensitive_set_is_exactly_four_labels() {
        let sensitive: Vec<_> = DocumentLabel::ALL
            .iter()
            .filter(|l| l.is_sensitive())
            .collect();
        assert_eq!(sensitive.len(), 4);
        assert!(DocumentLabel::Memo.is_sensitive());
        assert!(!DocumentLabel::Invoice.is_sensitive());
    }

    #[test]
    fn parse_loose_accepts_model_variants() {
        assert_eq!(DocumentLabel::parse_loose("resume"), Some(DocumentLabel::Resume));
        assert_eq!(DocumentLabel::parse_loose(" LETTER "), Some(DocumentLabel::Letter));
        assert_eq!(
            DocumentLabel::parse_loose("news_article"),
            Some(DocumentLabel::NewsArticle)
        );
        assert_eq!(
            DocumentLabel::parse_loose("\"Specification\""),
            Some(DocumentLabel::Specification)
        );
        assert_eq!(DocumentLabel::parse_loose("contract"), None);
    }

    #[test]
    fn override_reason_round_trip() {
        for (variant, s) in [
            (OverrideReason::BaseClassifier, "base_classifier"),
            (OverrideReason::HeuristicOverride, "heuristic_override"),
            (OverrideReason::ReasoningOverride, "reasoning_override"),
            (OverrideReason::FallbackResumeDetection, "fallback_resume_detection"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(OverrideReason::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(DocumentLabel::from_str("resume").is_err());
        assert!(OverrideReason::from_str("").is_err());
    }
}

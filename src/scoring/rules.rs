//! Fixed rule tables for the heuristic scorer.
//!
//! Every threshold, keyword list and pattern used to build a profile lives
//! here as data so the rules can be audited and tested in isolation.

use std::sync::LazyLock;

use regex::Regex;

use super::profile::{ComplexityLevel, IndustryVertical, TimeEstimate};

/// Title used when no line qualifies.
pub const UNTITLED: &str = "Untitled Form";

/// Entity name used when no line qualifies.
pub const UNKNOWN_ENTITY: &str = "Unknown";

/// Form identifier assigned to single-document analyses.
pub const DEFAULT_FORM_ID: &str = "PDF-1";

/// Number of leading lines searched for a title.
pub const TITLE_SCAN_LINES: usize = 5;

/// A title line must be strictly longer than this many characters.
pub const TITLE_MIN_CHARS: usize = 10;

/// Number of leading lines searched for an entity name.
pub const ENTITY_SCAN_LINES: usize = 3;

/// Lowercase keywords marking an entity line.
pub const ENTITY_KEYWORDS: &[&str] = &["bank", "department", "health", "insurance"];

/// Characters of text per estimated page.
pub const CHARS_PER_PAGE: usize = 3000;

/// Base score weight per signature occurrence.
pub const SIGNATURE_WEIGHT: u32 = 5;

/// Blank fields contributing one base score point.
pub const FIELDS_PER_POINT: u32 = 2;

/// Base score weight per attachment mention.
pub const ATTACHMENT_WEIGHT: u32 = 3;

/// Upper bound on the base score.
pub const BASE_SCORE_CAP: u32 = 100;

/// Scores above this suggest optional assistance.
pub const ASSISTANCE_THRESHOLD: u32 = 30;

/// Fixed confidence reported for heuristic analyses.
pub const CONFIDENCE_SCORE: u8 = 85;

/// Key driver labels, in rank order.
pub const KEY_DRIVERS: [&str; 3] = ["Form complexity", "Field count", "Industry requirements"];

/// Complexity tier with its inclusive upper score bound and time band.
#[derive(Debug, Clone, Copy)]
pub struct LevelBand {
    /// Inclusive upper bound; `None` for the open top tier.
    pub max_score: Option<u32>,
    pub level: ComplexityLevel,
    pub time_estimate: TimeEstimate,
}

/// Complexity tiers in ascending order.
pub const LEVEL_BANDS: &[LevelBand] = &[
    LevelBand {
        max_score: Some(15),
        level: ComplexityLevel::Low,
        time_estimate: TimeEstimate::new(5, 15),
    },
    LevelBand {
        max_score: Some(35),
        level: ComplexityLevel::Medium,
        time_estimate: TimeEstimate::new(15, 30),
    },
    LevelBand {
        max_score: Some(65),
        level: ComplexityLevel::High,
        time_estimate: TimeEstimate::new(30, 60),
    },
    LevelBand {
        max_score: None,
        level: ComplexityLevel::VeryHigh,
        time_estimate: TimeEstimate::new(60, 120),
    },
];

/// Industry classification and scoring rule.
#[derive(Debug, Clone, Copy)]
pub struct IndustryRule {
    pub vertical: IndustryVertical,
    pub subvertical: &'static str,
    /// Lowercase substrings that select this industry.
    pub keywords: &'static [&'static str],
    /// Lowercase substring that raises the industry score.
    pub bonus_keyword: &'static str,
    pub base_score: u32,
    pub bonus_score: u32,
}

/// Industry rules in priority order; the first matching rule wins.
pub const INDUSTRY_RULES: &[IndustryRule] = &[
    IndustryRule {
        vertical: IndustryVertical::Fins,
        subvertical: "Banking",
        keywords: &["bank", "financial", "investment"],
        bonus_keyword: "kyc",
        base_score: 5,
        bonus_score: 10,
    },
    IndustryRule {
        vertical: IndustryVertical::Hls,
        subvertical: "Healthcare",
        keywords: &["health", "medical", "patient"],
        bonus_keyword: "hipaa",
        base_score: 6,
        bonus_score: 12,
    },
    IndustryRule {
        vertical: IndustryVertical::PubSec,
        subvertical: "Government",
        keywords: &["government", "federal", "state"],
        bonus_keyword: "veterans",
        base_score: 8,
        bonus_score: 15,
    },
];

/// Requirement flags detected by pattern presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    Notarization,
    Witnesses,
    Identification,
    Deadline,
    ConditionalLogic,
}

/// Presence patterns for each detected requirement flag.
pub const REQUIREMENT_PATTERNS: &[(RequirementKind, &str)] = &[
    (RequirementKind::Notarization, r"(?i)notary"),
    (RequirementKind::Witnesses, r"(?i)witness"),
    (RequirementKind::Identification, r"(?i)id|identification"),
    (RequirementKind::Deadline, r"(?i)deadline"),
    (RequirementKind::ConditionalLogic, r"(?i)if\s+"),
];

#[allow(clippy::expect_used)]
pub(crate) static SIGNATURE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)signature").expect("signature regex is valid"));

#[allow(clippy::expect_used)]
pub(crate) static FIELD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{3,}").expect("field regex is valid"));

#[allow(clippy::expect_used)]
pub(crate) static ATTACHMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)attach").expect("attachment regex is valid"));

/// Compiled requirement patterns, in table order.
#[allow(clippy::expect_used)]
pub(crate) static COMPILED_REQUIREMENTS: LazyLock<Vec<(RequirementKind, Regex)>> =
    LazyLock::new(|| {
        REQUIREMENT_PATTERNS
            .iter()
            .map(|(kind, pattern)| {
                (
                    *kind,
                    Regex::new(pattern).expect("requirement regex is valid"),
                )
            })
            .collect()
    });

/// Returns the compiled pattern for a requirement kind.
pub(crate) fn requirement_pattern(kind: RequirementKind) -> Option<&'static Regex> {
    COMPILED_REQUIREMENTS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, regex)| regex)
}

/// Selects the first industry rule with a keyword contained in `lower_text`.
#[must_use]
pub fn classify_industry(lower_text: &str) -> Option<&'static IndustryRule> {
    INDUSTRY_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| lower_text.contains(kw)))
}

impl IndustryRule {
    /// Industry score for text already classified under this rule.
    #[must_use]
    pub fn score(&self, lower_text: &str) -> u32 {
        if lower_text.contains(self.bonus_keyword) {
            self.bonus_score
        } else {
            self.base_score
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bands_ascending_with_open_top() {
        let bounds: Vec<Option<u32>> = LEVEL_BANDS.iter().map(|b| b.max_score).collect();
        assert_eq!(bounds, vec![Some(15), Some(35), Some(65), None]);
        for band in LEVEL_BANDS {
            let t = band.time_estimate;
            assert!(t.min_minutes() <= t.max_minutes());
        }
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED_REQUIREMENTS.len(), REQUIREMENT_PATTERNS.len());
        assert!(requirement_pattern(RequirementKind::Deadline).is_some());
    }

    #[test]
    fn test_industry_priority_banking_beats_health() {
        let rule = classify_industry("the bank of health").unwrap();
        assert_eq!(rule.vertical, IndustryVertical::Fins);
    }

    #[test]
    fn test_industry_substring_match() {
        // "statement" contains "state"
        let rule = classify_industry("annual statement").unwrap();
        assert_eq!(rule.vertical, IndustryVertical::PubSec);
    }

    #[test]
    fn test_industry_no_match() {
        assert!(classify_industry("hospital intake form").is_none());
    }

    #[test]
    fn test_industry_scores() {
        let fins = &INDUSTRY_RULES[0];
        assert_eq!(fins.score("kyc check"), 10);
        assert_eq!(fins.score("nothing"), 5);
        let hls = &INDUSTRY_RULES[1];
        assert_eq!(hls.score("hipaa release"), 12);
        assert_eq!(hls.score("nothing"), 6);
        let pubsec = &INDUSTRY_RULES[2];
        assert_eq!(pubsec.score("veterans affairs"), 15);
        assert_eq!(pubsec.score("nothing"), 8);
    }

    #[test]
    fn test_field_pattern_counts_runs() {
        assert_eq!(FIELD_PATTERN.find_iter("__ ___ ______ _").count(), 2);
    }

    #[test]
    fn test_identification_pattern_matches_any_id_substring() {
        let id = requirement_pattern(RequirementKind::Identification).unwrap();
        assert!(id.is_match("Provide a valid ID"));
        assert!(id.is_match("provided"));
        assert!(!id.is_match("name and address"));
    }
}

//! Heuristic complexity scoring.
//!
//! The [`HeuristicScorer`] turns extracted document text into a
//! [`ComplexityProfile`] using the fixed rule tables in [`rules`]. Scoring is
//! a pure function of the text and the [`DocumentContext`]: it never fails,
//! and empty text still yields a fully populated profile.
//!
//! # Example
//!
//! ```
//! use formscan_core::scoring::{ComplexityLevel, HeuristicScorer};
//!
//! let profile = HeuristicScorer::new().score("Signature: ________", None);
//! assert_eq!(profile.complexity_level(), ComplexityLevel::Low);
//! ```

mod profile;
pub mod rules;

use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::{instrument, trace};

pub use profile::{
    AssistanceLevel, ComplexityLevel, ComplexityProfile, IndustryVertical, RequirementFlags,
    Scores, StructuralCounts, TimeEstimate, Tristate,
};

use rules::{
    ATTACHMENT_PATTERN, ATTACHMENT_WEIGHT, BASE_SCORE_CAP, CHARS_PER_PAGE, CONFIDENCE_SCORE,
    DEFAULT_FORM_ID, ENTITY_KEYWORDS, ENTITY_SCAN_LINES, FIELD_PATTERN, FIELDS_PER_POINT,
    KEY_DRIVERS, RequirementKind, SIGNATURE_PATTERN, SIGNATURE_WEIGHT, TITLE_MIN_CHARS,
    TITLE_SCAN_LINES, UNKNOWN_ENTITY, UNTITLED,
};

/// Identity metadata echoed into a profile alongside the text-derived fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    pub source_url: Option<String>,
    pub file_path: Option<String>,
    pub analysis_date: NaiveDate,
}

impl DocumentContext {
    /// Context dated today (local time) with an optional source URL.
    #[must_use]
    pub fn new(source_url: Option<&str>) -> Self {
        Self {
            source_url: source_url.map(str::to_string),
            file_path: None,
            analysis_date: Local::now().date_naive(),
        }
    }

    #[must_use]
    pub fn with_file_path(mut self, path: &Path) -> Self {
        self.file_path = Some(path.display().to_string());
        self
    }

    #[must_use]
    pub fn with_analysis_date(mut self, date: NaiveDate) -> Self {
        self.analysis_date = date;
        self
    }
}

/// Rule-based scorer. Stateless; cheap to copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Scores `text`, dating the profile today.
    #[must_use]
    pub fn score(&self, text: &str, source_url: Option<&str>) -> ComplexityProfile {
        self.score_with_context(text, &DocumentContext::new(source_url))
    }

    /// Scores `text` with explicit identity metadata.
    #[must_use]
    #[instrument(level = "debug", skip(self, text, context), fields(text_len = text.len()))]
    pub fn score_with_context(&self, text: &str, context: &DocumentContext) -> ComplexityProfile {
        let lower = text.to_lowercase();

        let signature_count = count_u32(SIGNATURE_PATTERN.find_iter(text).count());
        let field_count = count_u32(FIELD_PATTERN.find_iter(text).count());
        let attachment_count = count_u32(ATTACHMENT_PATTERN.find_iter(text).count());
        let condition_count = count_matches(RequirementKind::ConditionalLogic, text);

        let counts = StructuralCounts {
            page_count: page_count(text),
            signature_count,
            field_count,
            attachment_count,
            condition_count,
            third_party_count: 0,
            data_validation_count: 0,
        };

        let base_score = base_score(&counts);
        let industry = rules::classify_industry(&lower);
        let industry_vertical = industry.map_or(IndustryVertical::Unknown, |rule| rule.vertical);
        let industry_score = industry.map_or(0, |rule| rule.score(&lower));

        trace!(
            base_score,
            industry_score,
            industry = %industry_vertical,
            "computed scores"
        );

        let flags = RequirementFlags {
            notarization_required: detect(RequirementKind::Notarization, text),
            witnesses_required: detect(RequirementKind::Witnesses, text),
            identification_required: detect(RequirementKind::Identification, text),
            deadline_present: detect(RequirementKind::Deadline, text),
            conditional_field_logic: Tristate::from_presence(condition_count > 0),
            other_form_dependencies: Tristate::No,
        };

        ComplexityProfile {
            form_id: DEFAULT_FORM_ID.to_string(),
            source_url: context.source_url.clone(),
            file_path: context.file_path.clone(),
            analysis_date: context.analysis_date,
            title: extract_title(text),
            entity_name: extract_entity(text),
            industry_vertical,
            counts,
            scores: Scores::new(base_score, industry_score),
            key_drivers: KEY_DRIVERS.map(str::to_string),
            flags,
            confidence_score: CONFIDENCE_SCORE,
            notes: format!("Analyzed PDF with {} pages", counts.page_count),
        }
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn count_matches(kind: RequirementKind, text: &str) -> u32 {
    rules::requirement_pattern(kind).map_or(0, |re| count_u32(re.find_iter(text).count()))
}

fn detect(kind: RequirementKind, text: &str) -> Tristate {
    Tristate::from_presence(rules::requirement_pattern(kind).is_some_and(|re| re.is_match(text)))
}

fn page_count(text: &str) -> u32 {
    count_u32(text.chars().count() / CHARS_PER_PAGE).max(1)
}

fn base_score(counts: &StructuralCounts) -> u32 {
    let score = counts
        .signature_count
        .saturating_mul(SIGNATURE_WEIGHT)
        .saturating_add(counts.field_count / FIELDS_PER_POINT)
        .saturating_add(counts.attachment_count.saturating_mul(ATTACHMENT_WEIGHT));
    score.min(BASE_SCORE_CAP)
}

fn extract_title(text: &str) -> String {
    text.split('\n')
        .take(TITLE_SCAN_LINES)
        .map(str::trim)
        .find(|line| line.chars().count() > TITLE_MIN_CHARS)
        .map_or_else(|| UNTITLED.to_string(), str::to_string)
}

fn extract_entity(text: &str) -> String {
    text.split('\n')
        .take(ENTITY_SCAN_LINES)
        .find(|line| {
            let lower = line.to_lowercase();
            ENTITY_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .map_or_else(|| UNKNOWN_ENTITY.to_string(), |line| line.trim().to_string())
}

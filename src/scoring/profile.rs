//! Complexity profile types produced by the scorer and persisted by the store.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::rules::{INDUSTRY_RULES, LEVEL_BANDS};

/// Complexity tier, a pure function of the complexity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComplexityLevel {
    /// Score up to 15.
    Low,
    /// Score 16 through 35.
    Medium,
    /// Score 36 through 65.
    High,
    /// Score above 65.
    VeryHigh,
}

impl ComplexityLevel {
    /// Classifies a complexity score using the fixed threshold table.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        LEVEL_BANDS
            .iter()
            .find(|band| band.max_score.is_none_or(|max| score <= max))
            .map_or(Self::VeryHigh, |band| band.level)
    }

    /// Returns the completion time band for this tier.
    #[must_use]
    pub fn time_estimate(self) -> TimeEstimate {
        LEVEL_BANDS
            .iter()
            .find(|band| band.level == self)
            .map_or(TimeEstimate::new(60, 120), |band| band.time_estimate)
    }

    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "VeryHigh",
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComplexityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            "VeryHigh" => Ok(Self::VeryHigh),
            _ => Err(format!("invalid complexity level: {s}")),
        }
    }
}

/// Industry vertical. Each vertical has exactly one subvertical label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndustryVertical {
    /// Financial services (subvertical `Banking`).
    #[serde(rename = "FINS")]
    Fins,
    /// Health and life sciences (subvertical `Healthcare`).
    #[serde(rename = "HLS")]
    Hls,
    /// Public sector (subvertical `Government`).
    #[serde(rename = "PubSec")]
    PubSec,
    /// No industry keyword matched.
    Unknown,
}

impl IndustryVertical {
    /// Returns the database string representation of the vertical.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fins => "FINS",
            Self::Hls => "HLS",
            Self::PubSec => "PubSec",
            Self::Unknown => "Unknown",
        }
    }

    /// Returns the subvertical paired with this vertical.
    #[must_use]
    pub fn subvertical(&self) -> &'static str {
        INDUSTRY_RULES
            .iter()
            .find(|rule| rule.vertical == *self)
            .map_or("Unknown", |rule| rule.subvertical)
    }
}

impl fmt::Display for IndustryVertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IndustryVertical {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FINS" => Ok(Self::Fins),
            "HLS" => Ok(Self::Hls),
            "PubSec" => Ok(Self::PubSec),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(format!("invalid industry vertical: {s}")),
        }
    }
}

/// Whether human assistance is suggested for completing the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssistanceLevel {
    None,
    Optional,
}

impl AssistanceLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Optional => "Optional",
        }
    }
}

impl fmt::Display for AssistanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AssistanceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Optional" => Ok(Self::Optional),
            _ => Err(format!("invalid assistance level: {s}")),
        }
    }
}

/// Yes/No/Unknown requirement flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tristate {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Tristate {
    /// Maps keyword presence to `Yes`/`No`.
    #[must_use]
    pub fn from_presence(present: bool) -> Self {
        if present { Self::Yes } else { Self::No }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tristate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(Self::Yes),
            "No" => Ok(Self::No),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(format!("invalid tristate value: {s}")),
        }
    }
}

/// Estimated completion time in minutes. `min_minutes <= max_minutes` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEstimate {
    min_minutes: u32,
    max_minutes: u32,
}

impl TimeEstimate {
    /// Creates a band, swapping the bounds if they arrive reversed.
    #[must_use]
    pub const fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Self {
                min_minutes: a,
                max_minutes: b,
            }
        } else {
            Self {
                min_minutes: b,
                max_minutes: a,
            }
        }
    }

    #[must_use]
    pub fn min_minutes(&self) -> u32 {
        self.min_minutes
    }

    #[must_use]
    pub fn max_minutes(&self) -> u32 {
        self.max_minutes
    }
}

/// Score components. The complexity score is always the sum of base and
/// industry scores; there is no way to set it directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    base_score: u32,
    industry_score: u32,
    multiplier: f64,
}

impl Scores {
    /// Default multiplier applied to every profile.
    pub const DEFAULT_MULTIPLIER: f64 = 1.0;

    /// Creates scores with the default multiplier.
    #[must_use]
    pub fn new(base_score: u32, industry_score: u32) -> Self {
        Self {
            base_score,
            industry_score,
            multiplier: Self::DEFAULT_MULTIPLIER,
        }
    }

    /// Replaces the multiplier. Returns `None` unless the value is finite and positive.
    #[must_use]
    pub fn with_multiplier(self, multiplier: f64) -> Option<Self> {
        (multiplier.is_finite() && multiplier > 0.0).then_some(Self { multiplier, ..self })
    }

    #[must_use]
    pub fn base_score(&self) -> u32 {
        self.base_score
    }

    #[must_use]
    pub fn industry_score(&self) -> u32 {
        self.industry_score
    }

    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    #[must_use]
    pub fn complexity_score(&self) -> u32 {
        self.base_score.saturating_add(self.industry_score)
    }

    #[must_use]
    pub fn complexity_level(&self) -> ComplexityLevel {
        ComplexityLevel::from_score(self.complexity_score())
    }
}

/// Structural counts derived from the document text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuralCounts {
    pub page_count: u32,
    pub signature_count: u32,
    pub field_count: u32,
    pub attachment_count: u32,
    pub condition_count: u32,
    pub third_party_count: u32,
    pub data_validation_count: u32,
}

/// Requirement flags detected from keywords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequirementFlags {
    pub notarization_required: Tristate,
    pub witnesses_required: Tristate,
    pub identification_required: Tristate,
    pub deadline_present: Tristate,
    pub conditional_field_logic: Tristate,
    /// No detection rule exists yet; the scorer always reports `No`.
    pub other_form_dependencies: Tristate,
}

/// The analysis result for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexityProfile {
    pub form_id: String,
    pub source_url: Option<String>,
    pub file_path: Option<String>,
    pub analysis_date: NaiveDate,
    pub title: String,
    pub entity_name: String,
    pub industry_vertical: IndustryVertical,
    pub counts: StructuralCounts,
    pub scores: Scores,
    /// Ranked labels explaining the score.
    pub key_drivers: [String; 3],
    pub flags: RequirementFlags,
    /// Confidence in the analysis, 0 through 100.
    pub confidence_score: u8,
    pub notes: String,
}

impl ComplexityProfile {
    #[must_use]
    pub fn industry_subvertical(&self) -> &'static str {
        self.industry_vertical.subvertical()
    }

    #[must_use]
    pub fn complexity_score(&self) -> u32 {
        self.scores.complexity_score()
    }

    #[must_use]
    pub fn complexity_level(&self) -> ComplexityLevel {
        self.scores.complexity_level()
    }

    #[must_use]
    pub fn time_estimate(&self) -> TimeEstimate {
        self.complexity_level().time_estimate()
    }

    /// Assistance is suggested once the score exceeds the threshold.
    #[must_use]
    pub fn assistance_level(&self) -> AssistanceLevel {
        if self.complexity_score() > super::rules::ASSISTANCE_THRESHOLD {
            AssistanceLevel::Optional
        } else {
            AssistanceLevel::None
        }
    }
}

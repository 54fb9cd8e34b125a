//! Stored analysis rows and the summary aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::error::StoreError;
use crate::scoring::{
    AssistanceLevel, ComplexityLevel, ComplexityProfile, IndustryVertical, RequirementFlags,
    Scores, StructuralCounts, Tristate,
};

/// Date format of the `analysis_date` column.
pub(crate) const ANALYSIS_DATE_FORMAT: &str = "%Y-%m-%d";

/// A profile as persisted, with its store-assigned identity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProfile {
    /// Unique, store-assigned id.
    pub id: i64,
    /// Insert time. Never earlier than any previously stored record's.
    pub created_at: DateTime<Utc>,
    pub profile: ComplexityProfile,
}

/// One `form_analyses` row with primitive column types.
///
/// This is also the flat field/value shape used for JSON export.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: i64,
    pub form_id: String,
    pub form_title: String,
    pub entity_name: String,
    pub industry_vertical: String,
    pub industry_subvertical: String,
    pub complexity_score: i64,
    pub complexity_level: String,
    pub base_score: i64,
    pub industry_score: i64,
    pub multiplier: f64,
    pub page_count: i64,
    pub signature_count: i64,
    pub field_count: i64,
    pub attachment_count: i64,
    pub condition_count: i64,
    pub third_party_count: i64,
    pub data_validation_count: i64,
    pub key_driver_1: String,
    pub key_driver_2: String,
    pub key_driver_3: String,
    pub time_estimate_min: i64,
    pub time_estimate_max: i64,
    pub assistance_level: String,
    pub notarization_required: String,
    pub witnesses_required: String,
    pub identification_required: String,
    pub deadline_present: String,
    pub conditional_field_logic: String,
    pub other_form_dependencies: String,
    pub confidence_score: i64,
    pub analysis_date: String,
    pub notes: String,
    pub source_url: Option<String>,
    pub file_path: Option<String>,
    pub created_at: String,
}

impl From<&StoredProfile> for ProfileRecord {
    fn from(stored: &StoredProfile) -> Self {
        let p = &stored.profile;
        let time = p.time_estimate();
        let [key_driver_1, key_driver_2, key_driver_3] = p.key_drivers.clone();
        Self {
            id: stored.id,
            form_id: p.form_id.clone(),
            form_title: p.title.clone(),
            entity_name: p.entity_name.clone(),
            industry_vertical: p.industry_vertical.as_str().to_string(),
            industry_subvertical: p.industry_subvertical().to_string(),
            complexity_score: i64::from(p.complexity_score()),
            complexity_level: p.complexity_level().as_str().to_string(),
            base_score: i64::from(p.scores.base_score()),
            industry_score: i64::from(p.scores.industry_score()),
            multiplier: p.scores.multiplier(),
            page_count: i64::from(p.counts.page_count),
            signature_count: i64::from(p.counts.signature_count),
            field_count: i64::from(p.counts.field_count),
            attachment_count: i64::from(p.counts.attachment_count),
            condition_count: i64::from(p.counts.condition_count),
            third_party_count: i64::from(p.counts.third_party_count),
            data_validation_count: i64::from(p.counts.data_validation_count),
            key_driver_1,
            key_driver_2,
            key_driver_3,
            time_estimate_min: i64::from(time.min_minutes()),
            time_estimate_max: i64::from(time.max_minutes()),
            assistance_level: p.assistance_level().as_str().to_string(),
            notarization_required: p.flags.notarization_required.as_str().to_string(),
            witnesses_required: p.flags.witnesses_required.as_str().to_string(),
            identification_required: p.flags.identification_required.as_str().to_string(),
            deadline_present: p.flags.deadline_present.as_str().to_string(),
            conditional_field_logic: p.flags.conditional_field_logic.as_str().to_string(),
            other_form_dependencies: p.flags.other_form_dependencies.as_str().to_string(),
            confidence_score: i64::from(p.confidence_score),
            analysis_date: p.analysis_date.format(ANALYSIS_DATE_FORMAT).to_string(),
            notes: p.notes.clone(),
            source_url: p.source_url.clone(),
            file_path: p.file_path.clone(),
            created_at: format_created_at(&stored.created_at),
        }
    }
}

impl TryFrom<ProfileRecord> for StoredProfile {
    type Error = StoreError;

    fn try_from(row: ProfileRecord) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |reason: String| StoreError::corrupt(id, reason);
        let count = |name: &str, value: i64| {
            u32::try_from(value).map_err(|_| corrupt(format!("{name} out of range: {value}")))
        };
        let flag = |value: &str| value.parse::<Tristate>().map_err(corrupt);

        let industry_vertical: IndustryVertical = row.industry_vertical.parse().map_err(corrupt)?;
        let stored_level: ComplexityLevel = row.complexity_level.parse().map_err(corrupt)?;
        let stored_assistance: AssistanceLevel = row.assistance_level.parse().map_err(corrupt)?;

        let scores = Scores::new(
            count("base_score", row.base_score)?,
            count("industry_score", row.industry_score)?,
        )
        .with_multiplier(row.multiplier)
        .ok_or_else(|| corrupt(format!("invalid multiplier: {}", row.multiplier)))?;

        if i64::from(scores.complexity_score()) != row.complexity_score
            || scores.complexity_level() != stored_level
        {
            return Err(corrupt(format!(
                "complexity {} ({}) does not match components {} + {}",
                row.complexity_score, row.complexity_level, row.base_score, row.industry_score
            )));
        }

        let counts = StructuralCounts {
            page_count: count("page_count", row.page_count)?,
            signature_count: count("signature_count", row.signature_count)?,
            field_count: count("field_count", row.field_count)?,
            attachment_count: count("attachment_count", row.attachment_count)?,
            condition_count: count("condition_count", row.condition_count)?,
            third_party_count: count("third_party_count", row.third_party_count)?,
            data_validation_count: count("data_validation_count", row.data_validation_count)?,
        };

        let flags = RequirementFlags {
            notarization_required: flag(&row.notarization_required)?,
            witnesses_required: flag(&row.witnesses_required)?,
            identification_required: flag(&row.identification_required)?,
            deadline_present: flag(&row.deadline_present)?,
            conditional_field_logic: flag(&row.conditional_field_logic)?,
            other_form_dependencies: flag(&row.other_form_dependencies)?,
        };

        let confidence_score = u8::try_from(row.confidence_score)
            .ok()
            .filter(|c| *c <= 100)
            .ok_or_else(|| corrupt(format!("confidence out of range: {}", row.confidence_score)))?;

        let analysis_date = NaiveDate::parse_from_str(&row.analysis_date, ANALYSIS_DATE_FORMAT)
            .map_err(|e| corrupt(format!("invalid analysis_date {}: {e}", row.analysis_date)))?;

        let created_at = parse_created_at(&row.created_at)
            .ok_or_else(|| corrupt(format!("invalid created_at: {}", row.created_at)))?;

        let profile = ComplexityProfile {
            form_id: row.form_id,
            source_url: row.source_url,
            file_path: row.file_path,
            analysis_date,
            title: row.form_title,
            entity_name: row.entity_name,
            industry_vertical,
            counts,
            scores,
            key_drivers: [row.key_driver_1, row.key_driver_2, row.key_driver_3],
            flags,
            confidence_score,
            notes: row.notes,
        };

        if profile.assistance_level() != stored_assistance {
            return Err(corrupt(format!(
                "assistance level {stored_assistance} does not match score {}",
                profile.complexity_score()
            )));
        }

        Ok(Self {
            id,
            created_at,
            profile,
        })
    }
}

/// Millisecond-precision UTC timestamp, the same shape `SQLite` writes.
pub(crate) fn format_created_at(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub(crate) fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Aggregate view over every stored profile, taken from one consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub total_count: u64,
    pub count_by_complexity_level: BTreeMap<ComplexityLevel, u64>,
    pub count_by_industry_vertical: BTreeMap<IndustryVertical, u64>,
}

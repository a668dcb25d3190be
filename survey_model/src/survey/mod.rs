//! Survey definitions - the records collected in the field.

mod description;
mod point;

pub use description::*;
pub use point::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Result, SurveyError};

/// Unique identifier for surveys, e.g. `survey_001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurveyId(String);

impl SurveyId {
    const PREFIX: &'static str = "survey_";

    /// Build the id for the given 1-based sequence number.
    pub fn from_sequence(sequence: u32) -> Self {
        Self(format!("{}{:03}", Self::PREFIX, sequence))
    }

    /// Parse an id supplied by a caller (CLI argument, file name).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SurveyError::Validation("survey id must not be empty".into()));
        }
        if raw.contains(['/', '\\']) || raw.starts_with('.') {
            return Err(SurveyError::Validation(format!(
                "survey id {raw:?} must not contain path separators"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// The sequence number encoded in the id, if it follows the `survey_NNN` form.
    pub fn sequence(&self) -> Option<u32> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SurveyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named collection of geolocated sample points and their annotations.
///
/// Surveys are only mutated through [`crate::SurveyStore`]; everything else
/// sees a borrowed, read-only view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub(crate) id: SurveyId,

    /// Sample points in insertion order. Descriptions refer to them by index.
    pub(crate) coordinates: Vec<SurveyPoint>,

    /// Annotations in insertion order.
    pub(crate) descriptions: Vec<Description>,

    /// Geological formation noted when the survey was opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) formation: Option<String>,

    /// Day the survey was opened. Documents written before dates were
    /// recorded have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) date: Option<NaiveDate>,
}

impl Survey {
    /// Create a new empty survey.
    pub(crate) fn new(id: SurveyId) -> Self {
        Self {
            id,
            coordinates: Vec::new(),
            descriptions: Vec::new(),
            formation: None,
            date: None,
        }
    }

    pub fn id(&self) -> &SurveyId {
        &self.id
    }

    pub fn coordinates(&self) -> &[SurveyPoint] {
        &self.coordinates
    }

    pub fn descriptions(&self) -> &[Description] {
        &self.descriptions
    }

    pub fn formation(&self) -> Option<&str> {
        self.formation.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn point_count(&self) -> usize {
        self.coordinates.len()
    }

    /// A survey can be mapped once it holds at least one point.
    pub fn is_map_ready(&self) -> bool {
        !self.coordinates.is_empty()
    }

    /// Descriptions attached to the point at `index`, in insertion order.
    pub fn descriptions_at(&self, index: usize) -> impl Iterator<Item = &Description> {
        self.descriptions
            .iter()
            .filter(move |d| d.location_index == index)
    }

    /// Check every invariant a survey read from disk must hold.
    pub fn validate(&self) -> Result<()> {
        for point in &self.coordinates {
            SurveyPoint::new(point.lat, point.lon, point.elevation)?;
        }
        for description in &self.descriptions {
            if description.location_index >= self.coordinates.len() {
                return Err(SurveyError::Index {
                    survey: self.id.clone(),
                    index: description.location_index,
                    len: self.coordinates.len(),
                });
            }
        }
        Ok(())
    }

    /// Encode to the canonical JSON document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from the canonical JSON document, validating invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        let survey: Survey = serde_json::from_str(json)?;
        survey.validate()?;
        Ok(survey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_id_sequence() {
        let id = SurveyId::from_sequence(1);
        assert_eq!(id.as_str(), "survey_001");
        assert_eq!(id.sequence(), Some(1));

        assert_eq!(SurveyId::from_sequence(1234).as_str(), "survey_1234");
        assert_eq!(SurveyId::parse("field-notes").unwrap().sequence(), None);
    }

    #[test]
    fn test_survey_id_rejects_paths() {
        assert!(SurveyId::parse("../etc/passwd").is_err());
        assert!(SurveyId::parse("  ").is_err());
        assert_eq!(SurveyId::parse(" survey_007 ").unwrap().as_str(), "survey_007");
    }

    #[test]
    fn test_json_schema_shape() {
        let mut survey = Survey::new(SurveyId::from_sequence(1));
        survey
            .coordinates
            .push(SurveyPoint::new(34.0, -118.0, 100.0).unwrap());
        survey.descriptions.push(Description::new(0, "pink granite"));

        let value: serde_json::Value = serde_json::from_str(&survey.to_json().unwrap()).unwrap();
        assert_eq!(value["id"], "survey_001");
        assert_eq!(value["coordinates"][0]["lat"], 34.0);
        assert_eq!(value["coordinates"][0]["lon"], -118.0);
        assert_eq!(value["coordinates"][0]["elevation"], 100.0);
        assert_eq!(value["descriptions"][0]["location_index"], 0);
        assert!(value["descriptions"][0]["inferred_type"].is_null());
        assert!(value.get("formation").is_none());
        assert!(value.get("date").is_none());
    }

    #[test]
    fn test_date_round_trip() {
        let mut survey = Survey::new(SurveyId::from_sequence(5));
        survey.date = NaiveDate::from_ymd_opt(2024, 3, 9);

        let json = survey.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["date"], "2024-03-09");
        assert_eq!(Survey::from_json(&json).unwrap().date(), survey.date);

        let undated = r#"{"id": "survey_006", "coordinates": [], "descriptions": []}"#;
        assert_eq!(Survey::from_json(undated).unwrap().date(), None);
    }

    #[test]
    fn test_from_json_rejects_dangling_description() {
        let json = r#"{
            "id": "survey_002",
            "coordinates": [{"lat": 1.0, "lon": 2.0, "elevation": 3.0}],
            "descriptions": [{"location_index": 4, "text": "x", "inferred_type": null}]
        }"#;
        assert!(matches!(
            Survey::from_json(json),
            Err(SurveyError::Index { index: 4, len: 1, .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_bad_latitude() {
        let json = r#"{
            "id": "survey_003",
            "coordinates": [{"lat": 91.0, "lon": 2.0, "elevation": 3.0}],
            "descriptions": []
        }"#;
        assert!(matches!(
            Survey::from_json(json),
            Err(SurveyError::Validation(_))
        ));
    }

    #[test]
    fn test_descriptions_at() {
        let mut survey = Survey::new(SurveyId::from_sequence(4));
        survey.coordinates.push(SurveyPoint::new(0.0, 0.0, 0.0).unwrap());
        survey.coordinates.push(SurveyPoint::new(0.0, 1.0, 0.0).unwrap());
        survey.descriptions.push(Description::new(1, "first"));
        survey.descriptions.push(Description::new(0, "other"));
        survey.descriptions.push(Description::new(1, "second"));

        let texts: Vec<_> = survey.descriptions_at(1).map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(survey.is_map_ready());
    }
}

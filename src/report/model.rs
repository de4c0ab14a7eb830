//! Career report value object and its validation.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Generated career insight report. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Report {
    pub personal_insight_report: PersonalInsightReport,
    pub recommended_career_paths: Vec<CareerPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonalInsightReport {
    pub title: String,
    pub summary: String,
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CareerPath {
    pub cluster: String,
    pub description: String,
}

impl CareerPath {
    /// URL path segment for this cluster: lowercased, spaces become `-`.
    pub fn slug(&self) -> String {
        self.cluster.to_lowercase().replace(' ', "-")
    }
}

impl Report {
    /// Parse and validate model output or a cached document.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::NoPayload);
        }
        let value: serde_json::Value = serde_json::from_str(text)?;
        serde_json::from_value(value).map_err(|e| ParseError::SchemaViolation {
            field: "report".into(),
            reason: e.to_string(),
        })
    }

    /// Canonical serialized form, as stored in `careerReport`.
    pub fn to_json(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string(self)?)
    }
}

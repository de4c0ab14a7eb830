//! Onboarding data model: transcript turns and the extracted profile.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message in the onboarding transcript. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Structured facts gathered during onboarding. All fields non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingData {
    pub interests: String,
    pub subjects: String,
    pub hobbies: String,
}

/// A validated terminal payload from the model.
///
/// Only the extractor constructs one, so holding a value means `summary`
/// and every data field were non-empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedProfile {
    summary: String,
    data: OnboardingData,
}

impl ExtractedProfile {
    pub(crate) fn new(summary: String, data: OnboardingData) -> Self {
        Self { summary, data }
    }

    /// Closing message to show the user.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn data(&self) -> &OnboardingData {
        &self.data
    }

    pub fn into_data(self) -> OnboardingData {
        self.data
    }
}

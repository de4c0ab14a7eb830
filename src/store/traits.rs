//! `ProfileStore`: the persistence collaborator the core depends on.
//!
//! The core never sees storage mechanics: it reads a whole `UserProfile` by
//! uid and writes partial `ProfilePatch`es.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::onboarding::model::OnboardingData;
use crate::profile::model::{DocumentRefs, Education};

/// The persisted profile document, keyed by uid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_data: Option<OnboardingData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    /// JSON-serialized `Report`. Presence means generation is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<DocumentRefs>,
}

impl UserProfile {
    /// Whether the onboarding conversation produced data for this profile.
    pub fn onboarding_completed(&self) -> bool {
        self.onboarding_data.is_some()
    }
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    /// Onboarding data and its timestamp are write-once: ignored when the
    /// stored profile already has them.
    pub onboarding_data: Option<OnboardingData>,
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    pub career_report: Option<String>,
    pub education: Option<Education>,
    pub documents: Option<DocumentRefs>,
}

impl ProfilePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Onboarding result plus its completion timestamp, always together.
    pub fn with_onboarding(mut self, data: OnboardingData, completed_at: DateTime<Utc>) -> Self {
        self.onboarding_data = Some(data);
        self.onboarding_completed_at = Some(completed_at);
        self
    }

    pub fn with_career_report(mut self, serialized: impl Into<String>) -> Self {
        self.career_report = Some(serialized.into());
        self
    }

    pub fn with_education(mut self, education: Education) -> Self {
        self.education = Some(education);
        self
    }

    pub fn with_documents(mut self, documents: DocumentRefs) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge this patch into `profile` with store semantics.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(ref name) = self.display_name {
            profile.display_name = Some(name.clone());
        }
        if profile.onboarding_data.is_none() {
            profile.onboarding_data = self.onboarding_data.clone();
        }
        if profile.onboarding_completed_at.is_none() {
            profile.onboarding_completed_at = self.onboarding_completed_at;
        }
        if let Some(ref report) = self.career_report {
            profile.career_report = Some(report.clone());
        }
        if let Some(ref education) = self.education {
            profile.education = Some(education.clone());
        }
        if let Some(ref documents) = self.documents {
            profile.documents = Some(documents.clone());
        }
    }
}

/// Backend-agnostic profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile, `None` if the uid has no document.
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, DatabaseError>;

    /// Merge a patch into the uid's document, creating it if needed.
    async fn save(&self, uid: &str, patch: ProfilePatch) -> Result<(), DatabaseError>;
}

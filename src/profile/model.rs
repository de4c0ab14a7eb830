//! Education and document references attached to a profile.

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// School board the student studies under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationBoard {
    #[serde(rename = "CBSE")]
    Cbse,
    #[serde(rename = "ICSE")]
    Icse,
    #[serde(rename = "State Board")]
    StateBoard,
    #[serde(rename = "IB")]
    Ib,
    #[serde(rename = "Other")]
    Other,
}

impl EducationBoard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cbse => "CBSE",
            Self::Icse => "ICSE",
            Self::StateBoard => "State Board",
            Self::Ib => "IB",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for EducationBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EducationBoard {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CBSE" => Ok(Self::Cbse),
            "ICSE" => Ok(Self::Icse),
            "State Board" => Ok(Self::StateBoard),
            "IB" => Ok(Self::Ib),
            "Other" => Ok(Self::Other),
            other => Err(ProfileError::InvalidInput(format!(
                "unknown education board: {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub board: EducationBoard,
    pub grade: String,
}

/// References to already-uploaded files (URLs or storage paths).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marksheet: Option<String>,
}

impl DocumentRefs {
    pub fn is_empty(&self) -> bool {
        self.resume.is_none() && self.marksheet.is_none()
    }
}

/// Body of `POST /api/profile/documents`, as received.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSubmission {
    pub board: String,
    pub grade: String,
    #[serde(default)]
    pub documents: DocumentRefs,
}

impl DocumentSubmission {
    /// Validate the submission into its stored form.
    pub fn validate(self) -> Result<(Education, DocumentRefs), ProfileError> {
        let board: EducationBoard = self.board.parse()?;

        let grade = self.grade.trim();
        if grade.is_empty() {
            return Err(ProfileError::InvalidInput("grade is required".into()));
        }

        let documents = DocumentRefs {
            resume: non_blank(self.documents.resume),
            marksheet: non_blank(self.documents.marksheet),
        };
        if documents.is_empty() {
            return Err(ProfileError::InvalidInput(
                "at least one document (resume or marksheet) is required".into(),
            ));
        }

        Ok((
            Education {
                board,
                grade: grade.to_string(),
            },
            documents,
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

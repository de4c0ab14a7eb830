//! Error types for Disha.

use crate::onboarding::state::ConversationPhase;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No API credential configured for provider {provider}")]
    MissingCredential { provider: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors raised by a `ProfileStore`.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Model provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport failure: DNS, TLS, timeout, connection reset.
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    /// The provider answered with a non-success status.
    #[error("Provider {provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

impl LlmError {
    /// Whether the failure came from the network rather than from content.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::HttpStatus { .. })
    }
}

/// Structured data could not be read out of model text.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Response is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("Schema violation at {field}: {reason}")]
    SchemaViolation { field: String, reason: String },

    #[error("No structured payload found in response")]
    NoPayload,
}

/// Conversation state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot {action} while conversation is {phase}")]
    InvalidState {
        phase: ConversationPhase,
        action: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("No onboarding session for user {uid}")]
    NoSession { uid: String },

    #[error("Onboarding already completed for user {uid}")]
    AlreadyCompleted { uid: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Report pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("User data not found for {uid}")]
    NotFound { uid: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Report generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Report generation returned unusable data: {0}")]
    Parse(#[from] ParseError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

impl ReportError {
    /// Whether the caller can reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_network(),
            Self::Parse(_) | Self::Persistence(_) => true,
            Self::Configuration(_) | Self::NotFound { .. } | Self::Precondition(_) => false,
        }
    }
}

/// Education and document record errors.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Profile not found for {uid}")]
    NotFound { uid: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Authentication collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Unknown or expired token")]
    InvalidToken,
}

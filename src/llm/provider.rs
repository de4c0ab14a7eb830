//! Provider-neutral request/response types and the `LlmProvider` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::schema::ResponseSchema;
use crate::error::LlmError;

/// Author of a transcript entry, as the model sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single message in a conversation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// A multi-turn request whose reply is free text (possibly with embedded JSON).
#[derive(Debug, Clone)]
pub struct ConversationRequest {
    pub system_instruction: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ConversationRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            system_instruction: None,
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A single-prompt request whose reply must be JSON matching `schema`.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub prompt: String,
    pub schema: ResponseSchema,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl StructuredRequest {
    pub fn new(prompt: impl Into<String>, schema: ResponseSchema) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown,
}

impl FinishReason {
    /// Map a provider-specific finish reason string.
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            Some("STOP") | None => Self::Stop,
            Some("MAX_TOKENS") => Self::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                Self::ContentFilter
            }
            Some(_) => Self::Unknown,
        }
    }
}

/// The text the model produced, plus accounting.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
}

/// A text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Whether a credential is configured. Callers check this before any
    /// network call so a missing key is reported as configuration, not
    /// transport, failure.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Run a multi-turn conversation request.
    async fn complete(&self, request: ConversationRequest)
    -> Result<CompletionResponse, LlmError>;

    /// Run a schema-constrained request; the response text is JSON.
    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<CompletionResponse, LlmError>;
}

//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::llm::LlmConfig;

/// Default Gemini model used for both onboarding and reports.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    /// libSQL database file.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// `token:uid[:Display Name]` entries for the static token table.
    pub auth_tokens: Vec<String>,
    pub onboarding: OnboardingConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// A missing `GEMINI_API_KEY` is not an error here: the service still
    /// boots and reports a configuration error on the first model call.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        let model = lookup("DISHA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = lookup("DISHA_GEMINI_BASE_URL")
            .unwrap_or_else(|| crate::llm::gemini::DEFAULT_BASE_URL.to_string());

        let timeout_secs: u64 = lookup("DISHA_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let db_path = lookup("DISHA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/disha.db"));

        let port: u16 = lookup("DISHA_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let auth_tokens: Vec<String> = lookup("DISHA_AUTH_TOKENS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            llm: LlmConfig {
                api_key,
                model,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            db_path,
            port,
            auth_tokens,
            onboarding: OnboardingConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Knobs for onboarding turns.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Number of user answers the model is told to conclude within.
    /// Only used for the diagnostic warning; never enforced.
    pub expected_user_turns: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            expected_user_turns: 4,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Knobs for report generation.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 4096,
        }
    }
}

//! ReportGenerator: idempotent cache-then-generate pipeline.
//!
//! The first call after onboarding asks the model for a schema-constrained
//! report and stores its serialized form on the profile. Every later call
//! returns that stored text unchanged without touching the model.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use super::model::Report;
use super::prompts::build_report_request;
use crate::auth::SessionContext;
use crate::config::ReportConfig;
use crate::error::{ConfigError, ReportError};
use crate::llm::LlmProvider;
use crate::store::{ProfilePatch, ProfileStore};

/// Where a returned report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Cache,
    Generated,
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: Report,
    /// Exactly the text stored in `careerReport`.
    pub serialized: String,
    pub source: ReportSource,
}

type UidLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

pub struct ReportGenerator {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn ProfileStore>,
    config: ReportConfig,
    in_flight: UidLocks,
}

impl ReportGenerator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn ProfileStore>,
        config: ReportConfig,
    ) -> Self {
        Self {
            llm,
            store,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Return the caller's cached report, generating and storing it first
    /// if there is none.
    ///
    /// Calls for the same uid run one at a time, so a second caller sees
    /// the report the first one stored.
    pub async fn get_or_create(
        &self,
        session: &SessionContext,
    ) -> Result<ReportOutcome, ReportError> {
        let lock = self.uid_lock(&session.uid);
        let outcome = {
            let _guard = lock.lock().await;
            self.load_or_generate(session).await
        };
        self.release_uid_lock(&session.uid, lock);
        outcome
    }

    async fn load_or_generate(
        &self,
        session: &SessionContext,
    ) -> Result<ReportOutcome, ReportError> {
        let uid = session.uid.as_str();
        let profile = self
            .store
            .get(uid)
            .await?
            .ok_or_else(|| ReportError::NotFound { uid: uid.into() })?;

        if let Some(cached) = profile.career_report {
            match Report::parse(&cached) {
                Ok(report) => {
                    info!(uid = uid, "Returning cached report");
                    return Ok(ReportOutcome {
                        report,
                        serialized: cached,
                        source: ReportSource::Cache,
                    });
                }
                Err(e) => warn!(uid = uid, error = %e, "Cached report unreadable, regenerating"),
            }
        }

        let data = profile.onboarding_data.ok_or_else(|| {
            ReportError::Precondition("Onboarding must be completed first.".into())
        })?;

        if !self.llm.has_credentials() {
            return Err(ConfigError::MissingCredential {
                provider: self.llm.model_name().to_string(),
            }
            .into());
        }

        let display_name = profile
            .display_name
            .as_deref()
            .or(session.display_name.as_deref());
        let request = build_report_request(display_name, &data, &self.config);

        info!(uid = uid, model = self.llm.model_name(), "Generating report");
        let response = self.llm.complete_structured(request).await.inspect_err(|e| {
            warn!(uid = uid, error = %e, "Report model call failed");
        })?;
        let report = Report::parse(&response.content).inspect_err(|e| {
            warn!(uid = uid, error = %e, "Report response rejected");
        })?;
        let serialized = report.to_json()?;

        self.store
            .save(uid, ProfilePatch::new().with_career_report(serialized.clone()))
            .await?;
        info!(
            uid = uid,
            paths = report.recommended_career_paths.len(),
            output_tokens = response.output_tokens,
            "Report generated and cached"
        );

        Ok(ReportOutcome {
            report,
            serialized,
            source: ReportSource::Generated,
        })
    }

    fn uid_lock(&self, uid: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(uid.to_string()).or_default().clone()
    }

    /// Drop the uid's lock entry once nobody else holds or waits on it.
    fn release_uid_lock(&self, uid: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(uid);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{DatabaseError, LlmError, ParseError};
    use crate::llm::{CompletionResponse, ConversationRequest, FinishReason, StructuredRequest};
    use crate::onboarding::model::OnboardingData;
    use crate::store::{InMemoryProfileStore, UserProfile};

    const REPORT_JSON: &str = r#"{"personalInsightReport":{"title":"The Builder","summary":"You build.","strengths":["Curiosity"]},"recommendedCareerPaths":[{"cluster":"Robotics Engineering","description":"Robots."}]}"#;

    /// Stub LLM returning a fixed structured reply and counting calls.
    struct StubLlm {
        reply: Result<String, fn() -> LlmError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        delay: Duration,
        credentials: bool,
    }

    impl StubLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
                credentials: true,
            }
        }

        fn failing(err: fn() -> LlmError) -> Self {
            Self {
                reply: Err(err),
                ..Self::replying("")
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        fn has_credentials(&self) -> bool {
            self.credentials
        }

        async fn complete(
            &self,
            _request: ConversationRequest,
        ) -> Result<CompletionResponse, LlmError> {
            unreachable!("reports only issue structured requests")
        }

        async fn complete_structured(
            &self,
            request: StructuredRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 50,
                    output_tokens: 120,
                    finish_reason: FinishReason::Stop,
                }),
                Err(make) => Err(make()),
            }
        }
    }

    fn onboarded() -> UserProfile {
        UserProfile {
            display_name: Some("Asha".into()),
            onboarding_data: Some(OnboardingData {
                interests: "robotics".into(),
                subjects: "math".into(),
                hobbies: "building".into(),
            }),
            ..Default::default()
        }
    }

    fn session() -> SessionContext {
        SessionContext::new("u1", None)
    }

    async fn setup(
        llm: StubLlm,
        profile: Option<UserProfile>,
    ) -> (ReportGenerator, Arc<StubLlm>, Arc<InMemoryProfileStore>) {
        let llm = Arc::new(llm);
        let store = Arc::new(InMemoryProfileStore::new());
        if let Some(profile) = profile {
            store.insert("u1", profile).await;
        }
        let generator = ReportGenerator::new(llm.clone(), store.clone(), ReportConfig::default());
        (generator, llm, store)
    }

    #[tokio::test]
    async fn generates_then_serves_from_cache() {
        let (generator, llm, store) = setup(StubLlm::replying(REPORT_JSON), Some(onboarded())).await;

        let first = generator.get_or_create(&session()).await.unwrap();
        assert_eq!(first.source, ReportSource::Generated);
        assert_eq!(first.report.recommended_career_paths[0].slug(), "robotics-engineering");
        assert_eq!(llm.calls(), 1);
        assert!(llm.prompts.lock().unwrap()[0].contains("- Name: Asha"));

        let stored = store.get("u1").await.unwrap().unwrap().career_report.unwrap();
        assert_eq!(stored, first.serialized);

        let second = generator.get_or_create(&session()).await.unwrap();
        assert_eq!(second.source, ReportSource::Cache);
        assert_eq!(second.serialized, first.serialized);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn cached_report_returned_byte_identical_without_model_call() {
        // Non-canonical spacing must survive untouched.
        let cached = REPORT_JSON.replace(",", ", ");
        let profile = UserProfile {
            career_report: Some(cached.clone()),
            ..onboarded()
        };
        let (generator, llm, _) = setup(StubLlm::replying("unused"), Some(profile)).await;

        for _ in 0..2 {
            let outcome = generator.get_or_create(&session()).await.unwrap();
            assert_eq!(outcome.source, ReportSource::Cache);
            assert_eq!(outcome.serialized, cached);
        }
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn cache_hit_does_not_need_onboarding_data_or_credentials() {
        let profile = UserProfile {
            career_report: Some(REPORT_JSON.into()),
            ..Default::default()
        };
        let mut llm = StubLlm::replying("unused");
        llm.credentials = false;
        let (generator, _, _) = setup(llm, Some(profile)).await;
        assert!(generator.get_or_create(&session()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_onboarding_data_is_precondition_error() {
        let profile = UserProfile {
            display_name: Some("Asha".into()),
            ..Default::default()
        };
        let (generator, llm, _) = setup(StubLlm::replying(REPORT_JSON), Some(profile)).await;
        let err = generator.get_or_create(&session()).await.unwrap_err();
        assert!(matches!(err, ReportError::Precondition(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let (generator, _, _) = setup(StubLlm::replying(REPORT_JSON), None).await;
        let err = generator.get_or_create(&session()).await.unwrap_err();
        assert!(matches!(err, ReportError::NotFound { .. }));
    }

    #[tokio::test]
    async fn missing_credential_is_configuration_error() {
        let mut llm = StubLlm::replying(REPORT_JSON);
        llm.credentials = false;
        let (generator, llm, _) = setup(llm, Some(onboarded())).await;
        let err = generator.get_or_create(&session()).await.unwrap_err();
        assert!(matches!(err, ReportError::Configuration(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_model_output_leaves_profile_uncached() {
        let (generator, _, store) = setup(
            StubLlm::replying(r#"{"personalInsightReport":{"title":"t"}}"#),
            Some(onboarded()),
        )
        .await;
        let err = generator.get_or_create(&session()).await.unwrap_err();
        assert!(matches!(
            err,
            ReportError::Parse(ParseError::SchemaViolation { .. })
        ));
        assert!(err.is_retryable());
        assert!(store.get("u1").await.unwrap().unwrap().career_report.is_none());
    }

    #[tokio::test]
    async fn network_failure_is_retryable_generation_error() {
        let (generator, _, store) = setup(
            StubLlm::failing(|| LlmError::HttpStatus {
                provider: "gemini".into(),
                status: 503,
                body: "overloaded".into(),
            }),
            Some(onboarded()),
        )
        .await;
        let err = generator.get_or_create(&session()).await.unwrap_err();
        assert!(matches!(err, ReportError::Generation(_)));
        assert!(err.is_retryable());
        assert!(store.get("u1").await.unwrap().unwrap().career_report.is_none());
    }

    #[tokio::test]
    async fn unreadable_cache_is_regenerated() {
        let profile = UserProfile {
            career_report: Some("{not json".into()),
            ..onboarded()
        };
        let (generator, llm, store) = setup(StubLlm::replying(REPORT_JSON), Some(profile)).await;
        let outcome = generator.get_or_create(&session()).await.unwrap();
        assert_eq!(outcome.source, ReportSource::Generated);
        assert_eq!(llm.calls(), 1);
        assert_eq!(
            store.get("u1").await.unwrap().unwrap().career_report.unwrap(),
            outcome.serialized
        );
    }

    #[tokio::test]
    async fn concurrent_calls_generate_once() {
        let mut llm = StubLlm::replying(REPORT_JSON);
        llm.delay = Duration::from_millis(50);
        let (generator, llm, _) = setup(llm, Some(onboarded())).await;
        let generator = Arc::new(generator);

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                tokio::spawn(async move { generator.get_or_create(&session()).await })
            })
            .collect();

        let mut generated = 0;
        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            if outcome.source == ReportSource::Generated {
                generated += 1;
            }
        }
        assert_eq!(generated, 1);
        assert_eq!(llm.calls(), 1);
        assert!(generator.in_flight.lock().unwrap().is_empty());
    }

    /// Store whose reads fail.
    struct BrokenStore;

    #[async_trait]
    impl ProfileStore for BrokenStore {
        async fn get(&self, _uid: &str) -> Result<Option<UserProfile>, DatabaseError> {
            Err(DatabaseError::Pool("connection lost".into()))
        }

        async fn save(&self, _uid: &str, _patch: ProfilePatch) -> Result<(), DatabaseError> {
            Err(DatabaseError::Pool("connection lost".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_is_persistence_error() {
        let generator = ReportGenerator::new(
            Arc::new(StubLlm::replying(REPORT_JSON)),
            Arc::new(BrokenStore),
            ReportConfig::default(),
        );
        let err = generator.get_or_create(&session()).await.unwrap_err();
        assert!(matches!(err, ReportError::Persistence(_)));
    }
}

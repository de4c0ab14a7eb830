//! ConversationOrchestrator drives one user's onboarding chat from the
//! opening question to a persisted profile.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractor::try_extract_terminal;
use super::model::{ExtractedProfile, Turn};
use super::prompts::{APOLOGY_MESSAGE, OPENING_MESSAGE, build_turn_request};
use super::state::{ConversationPhase, ConversationState};
use crate::auth::SessionContext;
use crate::config::OnboardingConfig;
use crate::error::{ConfigError, DatabaseError, OnboardingError};
use crate::llm::LlmProvider;
use crate::store::{ProfilePatch, ProfileStore};

/// What happened after a user turn was processed.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The assistant turn that was appended.
    pub assistant_text: String,
    /// Phase after processing.
    pub phase: ConversationPhase,
    /// Present when the conversation concluded with a valid payload.
    pub extracted: Option<ExtractedProfile>,
    /// Set when the extracted profile could not be saved. The conversation
    /// still counts as concluded.
    pub persist_error: Option<DatabaseError>,
}

impl TurnOutcome {
    pub fn is_concluded(&self) -> bool {
        self.phase == ConversationPhase::Concluded
    }
}

/// Coordinates one onboarding conversation: transcript, model calls,
/// terminal detection, and the final profile write.
pub struct ConversationOrchestrator {
    session: SessionContext,
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn ProfileStore>,
    config: OnboardingConfig,
    state: RwLock<ConversationState>,
}

impl ConversationOrchestrator {
    pub fn new(
        session: SessionContext,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn ProfileStore>,
        config: OnboardingConfig,
    ) -> Self {
        Self {
            session,
            llm,
            store,
            config,
            state: RwLock::new(ConversationState::new()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn phase(&self) -> ConversationPhase {
        self.state.read().await.phase
    }

    /// A copy of the current state for display.
    pub async fn snapshot(&self) -> ConversationState {
        self.state.read().await.clone()
    }

    /// Open the conversation with the fixed greeting.
    ///
    /// Valid only once, from `Init`. Fails before any network traffic when
    /// the model has no credential.
    pub async fn start(&self) -> Result<Turn, OnboardingError> {
        let mut state = self.state.write().await;
        if state.phase != ConversationPhase::Init {
            return Err(OnboardingError::InvalidState {
                phase: state.phase,
                action: "start the conversation".into(),
            });
        }
        if !self.llm.has_credentials() {
            warn!(uid = %self.session.uid, "Onboarding start refused: no model credential");
            return Err(ConfigError::MissingCredential {
                provider: self.llm.model_name().to_string(),
            }
            .into());
        }

        let opening = Turn::assistant(OPENING_MESSAGE);
        state.push(opening.clone());
        state.transition_to(ConversationPhase::AwaitingUser)?;
        info!(uid = %self.session.uid, "Onboarding conversation started");
        Ok(opening)
    }

    /// Append a user answer and obtain the next assistant turn.
    ///
    /// The state lock is released before the model call, so a concurrent
    /// submission sees `AwaitingReply` and is rejected rather than queued.
    pub async fn submit_user_turn(&self, text: &str) -> Result<TurnOutcome, OnboardingError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(OnboardingError::InvalidInput("message text is empty".into()));
        }

        let (turns, user_turns) = {
            let mut state = self.state.write().await;
            match state.phase {
                ConversationPhase::AwaitingUser => {}
                ConversationPhase::AwaitingReply => {
                    return Err(OnboardingError::InvalidInput(
                        "still waiting for the previous reply".into(),
                    ));
                }
                phase => {
                    return Err(OnboardingError::InvalidState {
                        phase,
                        action: "submit a message".into(),
                    });
                }
            }
            state.push(Turn::user(text));
            state.transition_to(ConversationPhase::AwaitingReply)?;
            (state.turns.clone(), state.user_turn_count())
        };

        if user_turns > self.config.expected_user_turns {
            warn!(
                uid = %self.session.uid,
                user_turns,
                expected = self.config.expected_user_turns,
                "Onboarding running past the instructed number of turns"
            );
        }

        let request = build_turn_request(&turns, &self.config);
        match self.llm.complete(request).await {
            Ok(response) => self.handle_reply(response.content).await,
            Err(e) => {
                warn!(uid = %self.session.uid, error = %e, "Onboarding model call failed, concluding");
                self.conclude_degraded().await
            }
        }
    }

    async fn handle_reply(&self, raw: String) -> Result<TurnOutcome, OnboardingError> {
        let Some(profile) = try_extract_terminal(&raw) else {
            let mut state = self.state.write().await;
            state.push(Turn::assistant(raw.clone()));
            state.transition_to(ConversationPhase::AwaitingUser)?;
            debug!(uid = %self.session.uid, turns = state.turns.len(), "Onboarding continues");
            return Ok(TurnOutcome {
                assistant_text: raw,
                phase: state.phase,
                extracted: None,
                persist_error: None,
            });
        };

        {
            let mut state = self.state.write().await;
            state.push(Turn::assistant(profile.summary()));
            state.transition_to(ConversationPhase::Concluded)?;
        }
        info!(uid = %self.session.uid, "Onboarding concluded with profile");

        let persist_error = self.persist(&profile).await.err();
        Ok(TurnOutcome {
            assistant_text: profile.summary().to_string(),
            phase: ConversationPhase::Concluded,
            extracted: Some(profile),
            persist_error,
        })
    }

    async fn conclude_degraded(&self) -> Result<TurnOutcome, OnboardingError> {
        let mut state = self.state.write().await;
        state.push(Turn::assistant(APOLOGY_MESSAGE));
        state.transition_to(ConversationPhase::Concluded)?;
        Ok(TurnOutcome {
            assistant_text: APOLOGY_MESSAGE.to_string(),
            phase: state.phase,
            extracted: None,
            persist_error: None,
        })
    }

    async fn persist(&self, profile: &ExtractedProfile) -> Result<(), DatabaseError> {
        let mut patch = ProfilePatch::new().with_onboarding(profile.data().clone(), Utc::now());
        if let Some(ref name) = self.session.display_name {
            patch = patch.with_display_name(name.clone());
        }
        self.store
            .save(&self.session.uid, patch)
            .await
            .inspect_err(|e| {
                error!(uid = %self.session.uid, error = %e, "Failed to persist onboarding data");
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::{
        CompletionResponse, ConversationRequest, FinishReason, Role, StructuredRequest,
    };
    use crate::onboarding::model::TurnRole;
    use crate::store::{InMemoryProfileStore, UserProfile};

    /// Stub LLM that replays scripted replies and records requests.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        requests: Mutex<Vec<ConversationRequest>>,
        credentials: bool,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                credentials: true,
            }
        }

        fn without_credentials() -> Self {
            Self {
                credentials: false,
                ..Self::new(Vec::new())
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    fn ok_response(content: String) -> CompletionResponse {
        CompletionResponse {
            content,
            input_tokens: 10,
            output_tokens: 10,
            finish_reason: FinishReason::Stop,
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn has_credentials(&self) -> bool {
            self.credentials
        }

        async fn complete(
            &self,
            request: ConversationRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok("Tell me more!".into()))
                .map(ok_response)
        }

        async fn complete_structured(
            &self,
            _request: StructuredRequest,
        ) -> Result<CompletionResponse, LlmError> {
            unreachable!("onboarding never issues structured requests")
        }
    }

    /// Store whose writes always fail.
    struct FailingStore;

    #[async_trait]
    impl ProfileStore for FailingStore {
        async fn get(&self, _uid: &str) -> Result<Option<UserProfile>, DatabaseError> {
            Ok(None)
        }

        async fn save(&self, _uid: &str, _patch: ProfilePatch) -> Result<(), DatabaseError> {
            Err(DatabaseError::Query("disk full".into()))
        }
    }

    const TERMINAL: &str = r#"Great! {"summary":"Thanks!","data":{"interests":"robotics","subjects":"math","hobbies":"building"}}"#;

    fn session() -> SessionContext {
        SessionContext::new("u1", Some("Asha".into()))
    }

    fn orchestrator(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn ProfileStore>,
    ) -> ConversationOrchestrator {
        ConversationOrchestrator::new(session(), llm, store, OnboardingConfig::default())
    }

    fn network_error() -> LlmError {
        LlmError::RequestFailed {
            provider: "gemini".into(),
            reason: "connection reset".into(),
        }
    }

    #[tokio::test]
    async fn start_appends_opening_turn() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let orch = orchestrator(llm.clone(), Arc::new(InMemoryProfileStore::new()));

        let opening = orch.start().await.unwrap();
        assert_eq!(opening.text, OPENING_MESSAGE);
        assert_eq!(orch.phase().await, ConversationPhase::AwaitingUser);
        assert_eq!(orch.snapshot().await.turns.len(), 1);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn start_twice_is_invalid_state() {
        let orch = orchestrator(
            Arc::new(ScriptedLlm::new(vec![])),
            Arc::new(InMemoryProfileStore::new()),
        );
        orch.start().await.unwrap();
        let err = orch.start().await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::InvalidState {
                phase: ConversationPhase::AwaitingUser,
                ..
            }
        ));
        assert_eq!(orch.snapshot().await.turns.len(), 1);
    }

    #[tokio::test]
    async fn start_without_credential_is_configuration_error() {
        let orch = orchestrator(
            Arc::new(ScriptedLlm::without_credentials()),
            Arc::new(InMemoryProfileStore::new()),
        );
        let err = orch.start().await.unwrap_err();
        assert!(matches!(err, OnboardingError::Configuration(_)));
        assert_eq!(orch.phase().await, ConversationPhase::Init);
    }

    #[tokio::test]
    async fn submit_before_start_is_invalid_state() {
        let orch = orchestrator(
            Arc::new(ScriptedLlm::new(vec![])),
            Arc::new(InMemoryProfileStore::new()),
        );
        let err = orch.submit_user_turn("hello").await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::InvalidState {
                phase: ConversationPhase::Init,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn blank_input_rejected_without_model_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let orch = orchestrator(llm.clone(), Arc::new(InMemoryProfileStore::new()));
        orch.start().await.unwrap();

        let err = orch.submit_user_turn("   \n").await.unwrap_err();
        assert!(matches!(err, OnboardingError::InvalidInput(_)));
        assert_eq!(orch.snapshot().await.turns.len(), 1);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn non_terminal_reply_continues() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(
            "Nice to meet you, Asha! What do you enjoy doing after school?".into(),
        )]));
        let store = Arc::new(InMemoryProfileStore::new());
        let orch = orchestrator(llm.clone(), store.clone());
        orch.start().await.unwrap();

        let outcome = orch.submit_user_turn("I'm Asha").await.unwrap();
        assert_eq!(outcome.phase, ConversationPhase::AwaitingUser);
        assert!(outcome.extracted.is_none());
        assert!(outcome.assistant_text.starts_with("Nice to meet you"));

        let state = orch.snapshot().await;
        assert_eq!(state.turns.len(), 3);
        assert!(store.get("u1").await.unwrap().is_none());

        let request = &llm.requests.lock().unwrap()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::Model);
        assert_eq!(request.messages[1].content, "I'm Asha");
        assert!(request.system_instruction.is_some());
    }

    #[tokio::test]
    async fn terminal_payload_concludes_and_persists() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(TERMINAL.into())]));
        let store = Arc::new(InMemoryProfileStore::new());
        let orch = orchestrator(llm, store.clone());
        orch.start().await.unwrap();

        let outcome = orch
            .submit_user_turn("I love math and robotics")
            .await
            .unwrap();
        assert!(outcome.is_concluded());
        assert_eq!(outcome.assistant_text, "Thanks!");
        assert!(outcome.persist_error.is_none());

        let state = orch.snapshot().await;
        let last = state.last_turn().unwrap();
        assert_eq!(last.role, TurnRole::Assistant);
        assert_eq!(last.text, "Thanks!");

        let profile = store.get("u1").await.unwrap().unwrap();
        let data = profile.onboarding_data.unwrap();
        assert_eq!(data.interests, "robotics");
        assert_eq!(data.subjects, "math");
        assert_eq!(data.hobbies, "building");
        assert!(profile.onboarding_completed_at.is_some());
        assert_eq!(profile.display_name.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn network_failure_concludes_with_apology() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(network_error())]));
        let store = Arc::new(InMemoryProfileStore::new());
        let orch = orchestrator(llm, store.clone());
        orch.start().await.unwrap();

        let outcome = orch.submit_user_turn("I'm Ravi").await.unwrap();
        assert!(outcome.is_concluded());
        assert!(outcome.extracted.is_none());
        assert_eq!(outcome.assistant_text, APOLOGY_MESSAGE);
        assert_eq!(orch.snapshot().await.last_turn().unwrap().text, APOLOGY_MESSAGE);
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concluded_conversation_rejects_more_turns() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(TERMINAL.into())]));
        let orch = orchestrator(llm.clone(), Arc::new(InMemoryProfileStore::new()));
        orch.start().await.unwrap();
        orch.submit_user_turn("robots!").await.unwrap();

        let err = orch.submit_user_turn("one more thing").await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::InvalidState {
                phase: ConversationPhase::Concluded,
                ..
            }
        ));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_reported_without_rollback() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(TERMINAL.into())]));
        let orch = orchestrator(llm, Arc::new(FailingStore));
        orch.start().await.unwrap();

        let outcome = orch.submit_user_turn("math").await.unwrap();
        assert!(outcome.is_concluded());
        assert!(outcome.extracted.is_some());
        assert!(matches!(outcome.persist_error, Some(DatabaseError::Query(_))));
        assert_eq!(orch.snapshot().await.last_turn().unwrap().text, "Thanks!");
    }

    #[tokio::test]
    async fn long_conversation_is_not_capped() {
        let replies = (0..8).map(|i| Ok(format!("Question {i}?"))).collect();
        let orch = orchestrator(
            Arc::new(ScriptedLlm::new(replies)),
            Arc::new(InMemoryProfileStore::new()),
        );
        orch.start().await.unwrap();
        for i in 0..8 {
            let outcome = orch.submit_user_turn(&format!("answer {i}")).await.unwrap();
            assert_eq!(outcome.phase, ConversationPhase::AwaitingUser);
        }
        assert_eq!(orch.snapshot().await.user_turn_count(), 8);
    }

    /// LLM that blocks inside `complete` until released.
    struct GatedLlm {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl LlmProvider for GatedLlm {
        fn model_name(&self) -> &str {
            "gated"
        }

        async fn complete(
            &self,
            _request: ConversationRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(ok_response("What else do you like?".into()))
        }

        async fn complete_structured(
            &self,
            _request: StructuredRequest,
        ) -> Result<CompletionResponse, LlmError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn submit_while_awaiting_reply_is_rejected_without_mutation() {
        let llm = Arc::new(GatedLlm {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orch = Arc::new(orchestrator(
            llm.clone(),
            Arc::new(InMemoryProfileStore::new()),
        ));
        orch.start().await.unwrap();

        let pending = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.submit_user_turn("first").await })
        };
        llm.entered.notified().await;

        assert_eq!(orch.phase().await, ConversationPhase::AwaitingReply);
        let before = orch.snapshot().await.turns;
        let err = orch.submit_user_turn("second").await.unwrap_err();
        assert!(matches!(err, OnboardingError::InvalidInput(_)));
        assert_eq!(orch.snapshot().await.turns, before);

        llm.release.notify_one();
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome.phase, ConversationPhase::AwaitingUser);
        assert_eq!(orch.snapshot().await.turns.len(), 3);
    }
}

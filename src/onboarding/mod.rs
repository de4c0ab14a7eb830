//! Onboarding: a short model-driven chat that collects the student's
//! interests, subjects, and hobbies.

pub mod extractor;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod routes;
pub mod state;

pub use extractor::try_extract_terminal;
pub use model::{ExtractedProfile, OnboardingData, Turn, TurnRole};
pub use orchestrator::{ConversationOrchestrator, TurnOutcome};
pub use registry::{SessionHandle, SessionRegistry};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{ConversationPhase, ConversationState};

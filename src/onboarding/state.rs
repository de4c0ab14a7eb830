//! Conversation state machine: which phase the onboarding chat is in.

use serde::{Deserialize, Serialize};

use super::model::{Turn, TurnRole};
use crate::error::OnboardingError;

/// The phases of the onboarding conversation.
///
/// Init → AwaitingUser ⇄ AwaitingReply → Concluded. `Failed` is part of the
/// phase set but nothing currently transitions into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    #[default]
    Init,
    AwaitingUser,
    AwaitingReply,
    Concluded,
    Failed,
}

impl ConversationPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ConversationPhase) -> bool {
        use ConversationPhase::*;
        matches!(
            (self, target),
            (Init, AwaitingUser)
                | (AwaitingUser, AwaitingReply)
                | (AwaitingReply, AwaitingUser)
                | (AwaitingReply, Concluded)
        )
    }

    /// Whether no further turns are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Concluded | Self::Failed)
    }
}

impl std::fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::AwaitingUser => "awaiting_user",
            Self::AwaitingReply => "awaiting_reply",
            Self::Concluded => "concluded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// In-memory conversation state. Lives only for the duration of onboarding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationState {
    pub phase: ConversationPhase,
    pub turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `target`, rejecting transitions the state machine forbids.
    pub fn transition_to(&mut self, target: ConversationPhase) -> Result<(), OnboardingError> {
        if !self.phase.can_transition_to(target) {
            return Err(OnboardingError::InvalidState {
                phase: self.phase,
                action: format!("move to {target}"),
            });
        }
        self.phase = target;
        Ok(())
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Number of turns the user has contributed so far.
    pub fn user_turn_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .count()
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

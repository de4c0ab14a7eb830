//! Fixed onboarding texts and the per-turn model request.

use super::model::{Turn, TurnRole};
use crate::config::OnboardingConfig;
use crate::llm::{ChatMessage, ConversationRequest};

/// First assistant turn, appended by `start()` without a model call.
pub const OPENING_MESSAGE: &str =
    "Hi there! I'm Disha, your career guide. To get started, what's your name?";

/// Final assistant turn when the model can't be reached.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I'm having a little trouble connecting. Let's try again in a moment.";

/// System instruction for every onboarding turn.
///
/// `expected_user_turns` is how many answers the model should collect
/// before emitting the terminal payload.
pub fn onboarding_system_instruction(expected_user_turns: usize) -> String {
    format!(
        "\
You are Disha, a friendly and encouraging AI career counselor for a student in India. \
Your goal is to get to know the user in a conversational way.
- Keep your questions short, open-ended, and engaging.
- Ask only one question at a time.
- Your first message was: \"{OPENING_MESSAGE}\"
- Based on the user's last answer, ask a relevant follow-up question.
- Learn about their interests, their favourite school subjects, and their hobbies.
- After about {expected_user_turns} answers from the user, conclude the conversation. \
Your final message must contain ONLY a JSON object of exactly this shape, with no other text:
{{\"summary\": \"<a short, warm closing message telling them you're ready for the next step>\", \
\"data\": {{\"interests\": \"<their interests>\", \"subjects\": \"<their favourite subjects>\", \
\"hobbies\": \"<their hobbies>\"}}}}
- Never output JSON before you are ready to conclude."
    )
}

/// Map transcript turns onto model roles: user stays user, assistant becomes model.
pub fn transcript_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| match turn.role {
            TurnRole::User => ChatMessage::user(&turn.text),
            TurnRole::Assistant => ChatMessage::model(&turn.text),
        })
        .collect()
}

/// Build the request for the next assistant turn from the full transcript.
pub fn build_turn_request(turns: &[Turn], config: &OnboardingConfig) -> ConversationRequest {
    ConversationRequest::new(transcript_messages(turns))
        .with_system_instruction(onboarding_system_instruction(config.expected_user_turns))
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn system_instruction_describes_terminal_shape() {
        let prompt = onboarding_system_instruction(4);
        assert!(prompt.contains("You are Disha"));
        assert!(prompt.contains("one question at a time"));
        assert!(prompt.contains("After about 4 answers"));
        assert!(prompt.contains("\"summary\""));
        assert!(prompt.contains("\"interests\""));
        assert!(prompt.contains("\"subjects\""));
        assert!(prompt.contains("\"hobbies\""));
        assert!(prompt.contains(OPENING_MESSAGE));
    }

    #[test]
    fn transcript_roles_are_mapped() {
        let turns = vec![
            Turn::assistant(OPENING_MESSAGE),
            Turn::user("I'm Asha"),
            Turn::assistant("Lovely name!"),
        ];
        let messages = transcript_messages(&turns);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::Model);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "I'm Asha");
        assert_eq!(messages[2].role, Role::Model);
    }

    #[test]
    fn turn_request_carries_config() {
        let config = OnboardingConfig::default();
        let request = build_turn_request(&[Turn::user("hi")], &config);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.temperature, Some(config.temperature));
        assert_eq!(request.max_tokens, Some(config.max_tokens));
        assert!(
            request
                .system_instruction
                .as_deref()
                .unwrap()
                .contains("career counselor")
        );
    }
}

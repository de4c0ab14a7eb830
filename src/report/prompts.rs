//! Report prompt and response schema.

use crate::config::ReportConfig;
use crate::llm::{ResponseSchema, StructuredRequest};
use crate::onboarding::model::OnboardingData;

/// Name used when the profile carries no display name.
pub const FALLBACK_NAME: &str = "the user";

/// Render control characters as visible escapes and trim surrounding space.
///
/// Interpolation stays plain text substitution; this only keeps a stray
/// newline in a profile field from reshaping the prompt.
pub fn sanitize_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

/// The report instruction for one student profile.
pub fn report_prompt(display_name: Option<&str>, data: &OnboardingData) -> String {
    let name = display_name
        .map(sanitize_field)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

    format!(
        "\
Act as an expert career counselor named Disha. Analyze the following student profile and \
generate a personalized insight report and career recommendations.

Student Profile:
- Name: {name}
- Interests: {interests}
- Favorite Subjects: {subjects}
- Hobbies: {hobbies}

Based on this, generate a JSON object with a specific schema.",
        interests = sanitize_field(&data.interests),
        subjects = sanitize_field(&data.subjects),
        hobbies = sanitize_field(&data.hobbies),
    )
}

/// Schema the model's JSON must follow; mirrors `Report`.
pub fn report_schema() -> ResponseSchema {
    ResponseSchema::object(vec![
        (
            "personalInsightReport",
            ResponseSchema::object(vec![
                ("title", ResponseSchema::string()),
                ("summary", ResponseSchema::string()),
                ("strengths", ResponseSchema::array(ResponseSchema::string())),
            ]),
        ),
        (
            "recommendedCareerPaths",
            ResponseSchema::array(ResponseSchema::object(vec![
                ("cluster", ResponseSchema::string()),
                ("description", ResponseSchema::string()),
            ])),
        ),
    ])
}

pub fn build_report_request(
    display_name: Option<&str>,
    data: &OnboardingData,
    config: &ReportConfig,
) -> StructuredRequest {
    StructuredRequest::new(report_prompt(display_name, data), report_schema())
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
}

//! Detects the terminal JSON payload inside a free-form model reply.
//!
//! The model is told to finish onboarding by emitting
//! `{"summary": ..., "data": {"interests", "subjects", "hobbies"}}`, but it
//! routinely wraps that object in prose or markdown fences. Extraction never
//! fails loudly: anything that is not a complete, valid payload is no match.

use serde::Deserialize;

use super::model::{ExtractedProfile, OnboardingData};

#[derive(Deserialize)]
struct RawTerminal {
    summary: String,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    interests: String,
    subjects: String,
    hobbies: String,
}

/// Find a valid terminal payload in `raw`, if there is one.
///
/// One pass over the text keeps a stack of open `{` positions; every
/// balanced object is a candidate, and among those that parse and validate
/// the one starting earliest wins. Braces inside JSON string literals don't
/// count. Quotes outside any object are prose and ignored.
pub fn try_extract_terminal(raw: &str) -> Option<ExtractedProfile> {
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut found: Option<(usize, ExtractedProfile)> = None;

    for (i, c) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                let Some(start) = open.pop() else {
                    continue;
                };
                if found.as_ref().is_none_or(|(best, _)| start < *best)
                    && let Some(profile) = parse_terminal(&raw[start..=i])
                {
                    found = Some((start, profile));
                }
                // Later candidates all start after this one.
                if open.is_empty() && found.is_some() {
                    break;
                }
            }
            _ => {}
        }
    }
    found.map(|(_, profile)| profile)
}

fn parse_terminal(candidate: &str) -> Option<ExtractedProfile> {
    let raw: RawTerminal = serde_json::from_str(candidate).ok()?;
    let summary = non_empty(raw.summary)?;
    let data = OnboardingData {
        interests: non_empty(raw.data.interests)?,
        subjects: non_empty(raw.data.subjects)?,
        hobbies: non_empty(raw.data.hobbies)?,
    };
    Some(ExtractedProfile::new(summary, data))
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Feedback recorded when the critic leaves the field out
pub const DEFAULT_FEEDBACK: &str = "No feedback provided.";

/// The critic's structured verdict on one draft
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Critique {
    /// Score per criterion name, as reported by the critic
    pub scores: BTreeMap<String, f64>,
    /// Suggestions for the next draft
    pub feedback: String,
    /// Temperature the critic proposes for the next round
    pub suggested_temperature: f64,
}

/// Wire shape of the critic's JSON object. Every field is optional.
#[derive(Debug, Deserialize)]
struct RawCritique {
    #[serde(default)]
    scores: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    suggested_temperature: Option<f64>,
}

#[derive(Error, Debug)]
pub enum CritiqueParseError {
    #[error("No JSON object found in the critic's response")]
    NoJsonObject,

    #[error("Critic response contains no decodable JSON object: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Critique object has an invalid shape: {0}")]
    InvalidShape(serde_json::Error),
}

impl Critique {
    /// Parse a critique from the critic's raw response text.
    ///
    /// The response may carry stray prose around the JSON object. Candidate
    /// objects are located with a balanced-brace scan that understands JSON
    /// string literals, and the first candidate that decodes wins:
    ///
    /// ```text
    /// Sure! Here is my evaluation:
    /// {"scores": {"clarity": 0.7}, "feedback": "...", "suggested_temperature": 0.4}
    /// ```
    ///
    /// Missing fields fall back to defaults; `fallback_temperature` (the
    /// temperature used this round) stands in for a missing suggestion.
    pub fn parse(raw: &str, fallback_temperature: f64) -> Result<Self, CritiqueParseError> {
        debug!(output_len = raw.len(), "Parsing critique");

        let object = first_json_object(raw)?;
        let critique: RawCritique = serde_json::from_value(Value::Object(object))
            .map_err(CritiqueParseError::InvalidShape)?;

        Ok(Self {
            scores: critique.scores.unwrap_or_default(),
            feedback: critique
                .feedback
                .unwrap_or_else(|| DEFAULT_FEEDBACK.to_string()),
            suggested_temperature: critique
                .suggested_temperature
                .unwrap_or(fallback_temperature),
        })
    }

    /// Get a short description of the critique for logging
    pub fn short_description(&self) -> String {
        let scores = self
            .scores
            .iter()
            .map(|(name, score)| format!("{name}={score:.2}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "[{}] next temperature {:.2}",
            scores, self.suggested_temperature
        )
    }
}

/// Decode the first balanced `{...}` span of `text` that is a valid JSON object.
///
/// A span that fails to decode is skipped whole and scanning resumes after its
/// closing brace. Values nested inside a malformed object are never taken for
/// the critique itself.
fn first_json_object(text: &str) -> Result<Map<String, Value>, CritiqueParseError> {
    let mut search_from = 0;
    let mut last_error = None;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        // Everything after an unclosed brace is inside it; a truncated object
        // must not be mistaken for one of its nested values.
        let Some(end) = balanced_end(text, start) else {
            break;
        };
        match serde_json::from_str::<Map<String, Value>>(&text[start..=end]) {
            Ok(object) => return Ok(object),
            Err(e) => {
                debug!(start, end, error = %e, "Skipping undecodable JSON candidate");
                last_error = Some(e);
            }
        }
        search_from = end + 1;
    }

    Err(match last_error {
        Some(e) => CritiqueParseError::InvalidJson(e),
        None => CritiqueParseError::NoJsonObject,
    })
}

/// Byte index of the `}` closing the `{` at `start`, if the span balances.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, byte) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

use serde::{Deserialize, Serialize};

use crate::History;

/// Final text reported when no round completed
pub const NO_OUTPUT_TEXT: &str = "No output was generated due to an error in the first iteration.";

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// A round's average score reached the threshold
    ThresholdMet,
    /// Every round ran without reaching the threshold
    MaxIterationsReached,
    /// The generator call failed
    GeneratorError,
    /// The critic call failed
    CritiqueError,
    /// The critic's reply could not be parsed
    ParseError,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThresholdMet => "threshold-met",
            Self::MaxIterationsReached => "max-iterations-reached",
            Self::GeneratorError => "generator-error",
            Self::CritiqueError => "critique-error",
            Self::ParseError => "parse-error",
        }
    }

    /// Whether the loop was cut short by a failure
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            Self::GeneratorError | Self::CritiqueError | Self::ParseError
        )
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The final outcome of a generate-critique-refine run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopResult {
    pub final_text: String,
    pub termination_reason: TerminationReason,
    /// Failure detail for aborted runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub history: History,
    pub total_duration_secs: f64,
}

impl LoopResult {
    /// Assemble a result; the final text is the last completed round's draft
    pub(crate) fn new(
        termination_reason: TerminationReason,
        error: Option<String>,
        history: History,
        total_duration_secs: f64,
    ) -> Self {
        let final_text = history
            .last()
            .map(|record| record.generated_text.clone())
            .unwrap_or_else(|| NO_OUTPUT_TEXT.to_string());
        Self {
            final_text,
            termination_reason,
            error,
            history,
            total_duration_secs,
        }
    }

    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    pub fn is_success(&self) -> bool {
        self.termination_reason == TerminationReason::ThresholdMet
    }

    /// Human-readable explanation of why the loop stopped
    pub fn summary(&self) -> String {
        match (self.termination_reason, self.history.last()) {
            (TerminationReason::ThresholdMet, Some(last)) => format!(
                "Threshold met or exceeded ({:.2}) in iteration {}.",
                last.average_score, last.index
            ),
            (TerminationReason::MaxIterationsReached, _) => {
                format!("Maximum iterations ({}) reached.", self.history.len())
            }
            (reason, _) => format!(
                "Stopped with {} after {} completed iteration(s): {}",
                reason,
                self.history.len(),
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.termination_reason {
            TerminationReason::ThresholdMet => 0,
            TerminationReason::MaxIterationsReached => 1,
            _ => 2,
        }
    }
}

mod critique;
pub mod evaluator;
mod prompts;
mod scoring;

pub use critique::{Critique, CritiqueParseError, DEFAULT_FEEDBACK};
pub use evaluator::{CriticEvaluationInput, CriticEvaluator, CriticSettings, EvaluationError};
pub use prompts::{CriticPrompts, GeneratorPrompts};
pub use scoring::ScoreCard;

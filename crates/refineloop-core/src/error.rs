use thiserror::Error;

/// A configuration rejected before any model call is made
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("User message must not be empty")]
    EmptyUserMessage,

    #[error("At least one criterion is required")]
    EmptyCriteria,

    #[error("Threshold must be within [0.0, 1.0], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("Max iterations must be at least 1")]
    ZeroIterations,
}

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Invalid loop configuration: {0}")]
    Validation(#[from] ValidationError),
}

impl LoopError {
    /// Process exit code for a run that never started; distinct from every
    /// [`LoopResult::exit_code`](crate::LoopResult::exit_code)
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 3,
        }
    }
}

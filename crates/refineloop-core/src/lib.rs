//! # refineloop-core
//!
//! Loop control for the generate-critique-refine cycle: a generator drafts
//! text, a critic scores it against named criteria and suggests the next
//! temperature, and the loop repeats until the average score reaches the
//! threshold or the iteration budget runs out.
//!
//! ## Key Types
//!
//! - [`LoopRunner`] - Drives rounds against two [`refineloop_model::ModelClient`]s
//! - [`LoopConfig`] - Validated run inputs
//! - [`LoopResult`] - Final text, [`TerminationReason`] and [`History`]

mod config;
mod context;
mod error;
mod history;
mod loop_runner;
mod outcome;
mod retry;

pub use config::{parse_criteria, GeneratorSettings, LoopConfig};
pub use error::{LoopError, ValidationError};
pub use history::{History, IterationRecord};
pub use loop_runner::LoopRunner;
pub use outcome::{LoopResult, TerminationReason, NO_OUTPUT_TEXT};
pub use retry::{RetryPolicy, RetryingClient};

pub use refineloop_critic::CriticSettings;

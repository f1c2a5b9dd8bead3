//! Plan execution against a live target instance.

mod executor;
mod order;
mod snapshot;

pub use executor::{ExecutionResult, StepResult, apply_plan};
pub use order::sort_steps;
pub use snapshot::Snapshot;

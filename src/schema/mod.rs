//! Schema comparison: diffing normalized schemas and turning the result into
//! a replayable plan.

mod diff;
mod export;
mod naming;
mod plan;

pub use diff::{ColumnChange, DiffOptions, SchemaDiff, TableChange, diff_schemas};
pub use export::{load_plan, parse_plan, plan_to_jsonl};
pub use naming::safe_db_name;
pub use plan::{
    OperationKind, Plan, PlanContext, PlanOptions, PlanStep, StepMeta, build_plan, build_plan_at,
};

/// Matching key for titles across instances: trimmed and optionally
/// case-folded.
pub fn title_key(title: &str, ignore_case: bool) -> String {
    let trimmed = title.trim();
    if ignore_case {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

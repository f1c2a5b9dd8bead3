use crate::schema::{PlanStep, title_key};

/// Execution order: operation priority, then table title, then step id.
pub fn sort_steps<'a>(mut steps: Vec<&'a PlanStep>, ignore_case: bool) -> Vec<&'a PlanStep> {
    steps.sort_by_cached_key(|step| {
        (
            step.op().priority(),
            title_key(step.meta.table_title.as_deref().unwrap_or_default(), ignore_case),
            step.id.clone(),
        )
    });
    steps
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::error::AppError;
use crate::schema::plan::{Plan, PlanOptions, PlanStep};

/// One JSON object per step. Every line carries `request.body`, `null` when
/// the step sends none.
pub fn plan_to_jsonl(plan: &Plan) -> Result<String> {
    let mut out = String::new();
    for step in &plan.steps {
        let mut line = serde_json::to_value(step)?;
        if let Some(request) = line.get_mut("request").and_then(Value::as_object_mut) {
            request.entry("body").or_insert(Value::Null);
        }
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    Ok(out)
}

/// Accepts either the JSON plan envelope or the line-delimited step encoding.
pub fn parse_plan(text: &str) -> Result<Plan> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Plan is empty").into());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.get("steps").is_some() {
            let mut plan: Plan = serde_json::from_value(value)
                .map_err(|err| AppError::validation(format!("Invalid plan: {}", err)))?;
            plan.steps.iter_mut().for_each(normalize_step);
            return Ok(plan);
        }
    }

    let mut steps = Vec::new();
    for (index, line) in trimmed.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut step: PlanStep = serde_json::from_str(line).map_err(|err| {
            AppError::validation(format!("Invalid plan line {}: {}", index + 1, err))
        })?;
        normalize_step(&mut step);
        steps.push(step);
    }

    Ok(Plan {
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        options: PlanOptions::default(),
        steps,
    })
}

/// `danger` always follows the operation kind, whatever the file says.
fn normalize_step(step: &mut PlanStep) {
    step.danger = step.op().is_dangerous();
}

pub fn load_plan(path: &Path) -> Result<Plan> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file: {}", path.display()))?;
    parse_plan(&text).with_context(|| format!("Failed to load plan from {}", path.display()))
}

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::apply::order::sort_steps;
use crate::apply::snapshot::Snapshot;
use crate::error::{AppError, RemoteApiError, classify_error};
use crate::remote::{
    ApiRequest, BaseSchema, EnvironmentConfig, FetchOptions, Transport, auth_headers,
    fetch_base_schema, is_auth_header, rewrite_url_to_target,
};
use crate::schema::{OperationKind, Plan, PlanStep};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Set when the step succeeded but the follow-up schema refresh did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl StepResult {
    fn success(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            ok: true,
            http_status: None,
            error_message: None,
            error_details: None,
            error_kind: None,
            warning: None,
        }
    }

    fn failure(step_id: &str, err: &anyhow::Error) -> Self {
        let remote = err.downcast_ref::<RemoteApiError>();
        Self {
            step_id: step_id.to_string(),
            ok: false,
            http_status: remote.map(|e| e.status),
            error_message: Some(format!("{:#}", err)),
            error_details: remote.map(|e| e.body.clone()),
            error_kind: Some(classify_error(err).as_str().to_string()),
            warning: None,
        }
    }

    /// Fully successful: the call went through and nothing needs attention.
    pub fn is_clean(&self) -> bool {
        self.ok && self.warning.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub results: Vec<StepResult>,
}

impl ExecutionResult {
    fn from_results(results: Vec<StepResult>) -> Self {
        Self {
            ok: results.iter().all(StepResult::is_clean),
            results,
        }
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.ok).count()
    }
}

/// Apply the selected steps of `plan` to `target`, one at a time.
///
/// An empty selection runs the whole plan. Step failures are recorded and do
/// not stop later steps; only the initial target schema fetch can abort the
/// run.
pub async fn apply_plan<T: Transport>(
    transport: &T,
    target: &EnvironmentConfig,
    plan: &Plan,
    selected: &[String],
    dry_run: bool,
) -> Result<ExecutionResult> {
    let steps = select_steps(plan, selected)?;
    let ignore_case = plan.options.ignore_case;
    let ordered = sort_steps(steps, ignore_case);

    if dry_run {
        info!("Dry run: {} steps selected, no calls issued", ordered.len());
        let results = ordered
            .iter()
            .map(|step| StepResult::success(&step.id))
            .collect();
        return Ok(ExecutionResult::from_results(results));
    }

    let schema = load_target_schema(transport, target)
        .await
        .context("Failed to load target schema before applying the plan")?;
    let mut snapshot = Snapshot::from_schema(&schema, ignore_case);

    let mut results = Vec::with_capacity(ordered.len());
    for step in ordered {
        let response = match run_step(transport, target, &snapshot, step).await {
            Ok(response) => response,
            Err(err) => {
                warn!("Step {} failed: {:#}", step.id, err);
                results.push(StepResult::failure(&step.id, &err));
                continue;
            }
        };
        info!("Step {} applied", step.id);

        let mut result = StepResult::success(&step.id);
        if matches!(step.op(), OperationKind::TableAdd) {
            if let (Some(title), Some(id)) =
                (step.meta.table_title.as_deref(), created_table_id(&response))
            {
                snapshot.insert_table(title, &id);
            }
        }
        if step.op().refreshes_snapshot() {
            match load_target_schema(transport, target).await {
                Ok(schema) => snapshot.replace(&schema),
                Err(err) => {
                    warn!("Schema refresh after step {} failed: {:#}", step.id, err);
                    result.warning = Some(format!("Schema refresh failed: {:#}", err));
                }
            }
        }
        results.push(result);
    }

    Ok(ExecutionResult::from_results(results))
}

fn select_steps<'a>(plan: &'a Plan, selected: &[String]) -> Result<Vec<&'a PlanStep>> {
    if selected.is_empty() {
        return Ok(plan.steps.iter().collect());
    }

    let known: HashSet<&str> = plan.steps.iter().map(|step| step.id.as_str()).collect();
    let unknown: Vec<&str> = selected
        .iter()
        .map(String::as_str)
        .filter(|id| !known.contains(id))
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::validation(format!(
            "Unknown step id(s): {}",
            unknown.join(", ")
        ))
        .into());
    }

    let wanted: HashSet<&str> = selected.iter().map(String::as_str).collect();
    Ok(plan
        .steps
        .iter()
        .filter(|step| wanted.contains(step.id.as_str()))
        .collect())
}

async fn load_target_schema<T: Transport>(
    transport: &T,
    target: &EnvironmentConfig,
) -> Result<BaseSchema> {
    let options = FetchOptions {
        include_system_columns: true,
    };
    fetch_base_schema(transport, target, options).await
}

async fn run_step<T: Transport>(
    transport: &T,
    target: &EnvironmentConfig,
    snapshot: &Snapshot,
    step: &PlanStep,
) -> Result<Value> {
    let url = rewrite_url_to_target(&snapshot.resolve_url(step)?, target);

    let mut headers = step.request.headers.clone();
    headers.retain(|name, _| !is_auth_header(name));
    headers.extend(auth_headers(target));

    let request = ApiRequest {
        method: step.request.method,
        url,
        headers,
        body: step.request.body.clone(),
    };
    transport.send(&request).await
}

fn created_table_id(response: &Value) -> Option<String> {
    [&response["id"], &response["table"]["id"], &response["data"]["id"]]
        .into_iter()
        .find_map(|value| match value {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

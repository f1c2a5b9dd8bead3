use anyhow::Result;
use serde_json::json;

use crate::apply::{ExecutionResult, StepResult, apply_plan};
use crate::cli::{ApplyArgs, CliArgs};
use crate::commands::common;
use crate::config::{OutputFormat, Side};
use crate::output::json as json_out;
use crate::output::{TableOptions, table};
use crate::remote::HttpTransport;
use crate::schema::load_plan;

const FAILURE_EXIT_CODE: i32 = 2;

pub fn run(args: &CliArgs, cmd: &ApplyArgs) -> Result<()> {
    let resolved = common::load_config(args)?;
    let plan = load_plan(&cmd.plan)?;

    // A dry run never talks to the target, so it does not need credentials.
    let target = if cmd.dry_run {
        resolved.environment(Side::Target)
    } else {
        resolved.require(Side::Target)?
    };

    let transport = HttpTransport::new(resolved.settings.timeout_ms)?;
    let rt = common::runtime()?;
    let result = rt.block_on(apply_plan(
        &transport,
        target,
        &plan,
        &cmd.steps,
        cmd.dry_run,
    ))?;

    if !args.quiet {
        let format = common::output_format(args, &resolved);
        output_result(&result, cmd.dry_run, format, common::json_pretty(&resolved))?;
    }

    if !result.ok {
        std::process::exit(FAILURE_EXIT_CODE);
    }
    Ok(())
}

fn output_result(
    result: &ExecutionResult,
    dry_run: bool,
    format: OutputFormat,
    json_pretty: bool,
) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        let payload = json!({
            "ok": result.ok,
            "dryRun": dry_run,
            "results": result.results,
        });
        println!("{}", json_out::emit_json(&payload, json_pretty)?);
        return Ok(());
    }

    if result.results.is_empty() {
        println!("Nothing to apply.");
        return Ok(());
    }

    let rows = result
        .results
        .iter()
        .map(|step| result_row(step, dry_run))
        .collect::<Vec<_>>();
    let rendered = table::render_rows_table(
        &["Step", "Status", "HTTP", "Detail"],
        &rows,
        format,
        &TableOptions::default(),
    );
    println!("{}", rendered);
    println!();
    println!("{}", summary_line(result, dry_run));
    Ok(())
}

fn result_row(step: &StepResult, dry_run: bool) -> Vec<Option<String>> {
    let status = match (step.ok, dry_run, step.warning.is_some()) {
        (true, true, _) => "planned",
        (true, false, false) => "ok",
        (true, false, true) => "ok (warning)",
        (false, _, _) => "failed",
    };
    let detail = step
        .error_message
        .clone()
        .or_else(|| step.warning.clone());
    vec![
        Some(step.step_id.clone()),
        Some(status.to_string()),
        step.http_status.map(|code| code.to_string()),
        detail,
    ]
}

fn summary_line(result: &ExecutionResult, dry_run: bool) -> String {
    let total = result.results.len();
    if dry_run {
        return format!("Dry run: {} step(s) would be applied.", total);
    }
    let failed = result.failed();
    if failed == 0 {
        format!("Applied {} step(s).", total)
    } else {
        format!("Applied {} of {} step(s); {} failed.", total - failed, total, failed)
    }
}

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::cli::{CliArgs, CompareArgs};
use crate::commands::common;
use crate::config::{OutputFormat, ResolvedConfig, Side};
use crate::output::json as json_out;
use crate::output::{TableOptions, table};
use crate::remote::{FetchOptions, HttpTransport, ensure_supported, fetch_base_schema};
use crate::schema::{
    ColumnChange, DiffOptions, Plan, PlanContext, SchemaDiff, TableChange, build_plan,
    diff_schemas, plan_to_jsonl,
};

const DRIFT_EXIT_CODE: i32 = 3;

/// Execute the `compare` command: fetch both schemas, diff, plan, and report.
pub fn run(args: &CliArgs, cmd: &CompareArgs) -> Result<()> {
    let resolved = common::load_config(args)?;
    let source = resolved.require(Side::Source)?;
    let target = resolved.require(Side::Target)?;
    ensure_supported(source)?;
    ensure_supported(target)?;

    let options = diff_options(cmd, &resolved);
    let fetch_options = FetchOptions {
        include_system_columns: cmd.include_system_columns
            || resolved.options.include_system_columns,
    };

    let transport = HttpTransport::new(resolved.settings.timeout_ms)?;
    let rt = common::runtime()?;
    let (source_schema, target_schema) = rt.block_on(async {
        tokio::try_join!(
            fetch_base_schema(&transport, source, fetch_options),
            fetch_base_schema(&transport, target, fetch_options),
        )
    })?;

    let diff = diff_schemas(&source_schema, &target_schema, options);
    let plan = build_plan(
        &diff,
        &PlanContext {
            source,
            target,
            ignore_case: options.ignore_case,
        },
    )?;
    info!(
        "Compared {} source tables with {} target tables: {} steps",
        source_schema.tables.len(),
        target_schema.tables.len(),
        plan.steps.len()
    );

    if let Some(path) = &cmd.out {
        common::write_file(path, &json_out::emit_json(&plan, true)?)?;
    }
    if let Some(path) = &cmd.jsonl {
        common::write_file(path, &plan_to_jsonl(&plan)?)?;
    }

    if !args.quiet {
        let format = common::output_format(args, &resolved);
        output_summary(&diff, &plan, format, common::json_pretty(&resolved))?;
    }

    if cmd.exit_code && !plan.steps.is_empty() {
        std::process::exit(DRIFT_EXIT_CODE);
    }
    Ok(())
}

fn diff_options(cmd: &CompareArgs, resolved: &ResolvedConfig) -> DiffOptions {
    DiffOptions {
        ignore_case: resolved.options.ignore_case && !cmd.case_sensitive,
        include_delete_ops: cmd.include_delete_ops || resolved.options.include_delete_ops,
        strict: cmd.strict,
    }
}

fn output_summary(
    diff: &SchemaDiff,
    plan: &Plan,
    format: OutputFormat,
    json_pretty: bool,
) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        let payload = json!({ "diff": diff, "plan": plan });
        println!("{}", json_out::emit_json(&payload, json_pretty)?);
        return Ok(());
    }

    if plan.steps.is_empty() {
        println!("No differences found.");
        return Ok(());
    }

    let options = TableOptions::default();
    println!("{}", render_counts(diff, format, &options));
    println!();
    println!("{}", render_steps(plan, format, &options));
    let dangerous = plan.dangerous_steps();
    if dangerous > 0 {
        println!();
        println!("{} dangerous step(s) will delete data when applied.", dangerous);
    }
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ChangeCounts {
    added: usize,
    updated: usize,
    deleted: usize,
}

fn count_changes(diff: &SchemaDiff) -> (ChangeCounts, ChangeCounts) {
    let mut tables = ChangeCounts::default();
    for change in &diff.table_changes {
        match change {
            TableChange::Add { .. } => tables.added += 1,
            TableChange::Delete { .. } => tables.deleted += 1,
        }
    }
    let mut columns = ChangeCounts::default();
    for change in &diff.column_changes {
        match change {
            ColumnChange::Add { .. } => columns.added += 1,
            ColumnChange::Update { .. } => columns.updated += 1,
            ColumnChange::Delete { .. } => columns.deleted += 1,
        }
    }
    (tables, columns)
}

fn render_counts(diff: &SchemaDiff, format: OutputFormat, options: &TableOptions) -> String {
    let (tables, columns) = count_changes(diff);
    let row = |label: &str, counts: &ChangeCounts| {
        vec![
            Some(label.to_string()),
            common::count_cell(counts.added),
            common::count_cell(counts.updated),
            common::count_cell(counts.deleted),
        ]
    };
    let rows = vec![row("Tables", &tables), row("Columns", &columns)];
    table::render_rows_table(&["Object", "Add", "Update", "Delete"], &rows, format, options)
}

fn render_steps(plan: &Plan, format: OutputFormat, options: &TableOptions) -> String {
    let rows = plan
        .steps
        .iter()
        .map(|step| {
            vec![
                Some(step.id.clone()),
                Some(step.request.method.as_str().to_string()),
                Some(step.title.clone()),
                step.danger.then(|| "yes".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    table::render_rows_table(&["Step", "Method", "Title", "Danger"], &rows, format, options)
}

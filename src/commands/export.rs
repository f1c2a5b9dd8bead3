use anyhow::Result;

use crate::cli::{CliArgs, ExportArgs};
use crate::commands::common;
use crate::schema::{load_plan, plan_to_jsonl};

pub fn run(args: &CliArgs, cmd: &ExportArgs) -> Result<()> {
    let plan = load_plan(&cmd.plan)?;
    let body = plan_to_jsonl(&plan)?;

    match &cmd.out {
        Some(path) => {
            common::write_file(path, &body)?;
            if !args.quiet {
                eprintln!(
                    "Wrote {} step(s) to {}",
                    plan.steps.len(),
                    path.display()
                );
            }
        }
        None => print!("{}", body),
    }
    Ok(())
}

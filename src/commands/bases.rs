use anyhow::Result;

use crate::cli::{BasesArgs, CliArgs};
use crate::commands::common;
use crate::config::OutputFormat;
use crate::output::json as json_out;
use crate::output::{TableOptions, table};
use crate::remote::{HttpTransport, list_bases};

pub fn run(args: &CliArgs, cmd: &BasesArgs) -> Result<()> {
    let resolved = common::load_config(args)?;
    let env = resolved.require(cmd.side)?;
    let format = common::output_format(args, &resolved);

    let transport = HttpTransport::new(resolved.settings.timeout_ms)?;
    let rt = common::runtime()?;
    let bases = rt.block_on(list_bases(&transport, env))?;

    if args.quiet {
        return Ok(());
    }

    if matches!(format, OutputFormat::Json) {
        let body = json_out::emit_json(&bases, common::json_pretty(&resolved))?;
        println!("{}", body);
        return Ok(());
    }

    let rows = bases
        .iter()
        .map(|base| vec![Some(base.id.clone()), Some(base.title.clone())])
        .collect::<Vec<_>>();
    let rendered =
        table::render_rows_table(&["Id", "Title"], &rows, format, &TableOptions::default());
    println!("{}", rendered);
    Ok(())
}

mod apply;
mod bases;
mod common;
mod compare;
mod completions;
mod config;
mod export;
mod help;
mod init;

use anyhow::Result;

use crate::cli::{CliArgs, CommandKind};

pub fn dispatch(args: &CliArgs) -> Result<()> {
    match &args.command {
        CommandKind::Help { all, command } => help::run(*all, command.as_deref()),
        CommandKind::Bases(cmd) => bases::run(args, cmd),
        CommandKind::Compare(cmd) => compare::run(args, cmd),
        CommandKind::Apply(cmd) => apply::run(args, cmd),
        CommandKind::Export(cmd) => export::run(args, cmd),
        CommandKind::Init(cmd) => init::run(args, cmd),
        CommandKind::Config(_) => config::run(args),
        CommandKind::Completions(cmd) => completions::run(cmd),
    }
}

mod args;

pub use args::{
    ApplyArgs, BasesArgs, CliArgs, CommandKind, CompareArgs, CompletionsArgs, ConfigArgs,
    ExportArgs, InitArgs, OutputFlags, SideFlags, build_cli,
};

pub fn parse() -> CliArgs {
    args::parse_args()
}

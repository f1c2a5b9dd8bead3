use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};

use crate::config::Side;

#[derive(Debug, Clone)]
pub struct OutputFlags {
    pub json: bool,
    pub markdown: bool,
    pub pretty: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SideFlags {
    pub env_name: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub base_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub source: SideFlags,
    pub target: SideFlags,
    pub api_version: Option<String>,
    pub timeout_ms: Option<u64>,
    pub output: OutputFlags,
    pub verbose: u8,
    pub quiet: bool,
    pub command: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Help { all: bool, command: Option<String> },
    Bases(BasesArgs),
    Compare(CompareArgs),
    Apply(ApplyArgs),
    Export(ExportArgs),
    Init(InitArgs),
    Config(ConfigArgs),
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasesArgs {
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompareArgs {
    pub out: Option<PathBuf>,
    pub jsonl: Option<PathBuf>,
    pub case_sensitive: bool,
    pub include_delete_ops: bool,
    pub include_system_columns: bool,
    pub strict: bool,
    pub exit_code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyArgs {
    pub plan: PathBuf,
    pub steps: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArgs {
    pub plan: PathBuf,
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigArgs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionsArgs {
    pub shell: Option<String>,
}

pub fn build_cli(show_all: bool) -> Command {
    let mut cmd = Command::new("ncsync")
        .about("Compare NocoDB schemas and apply the differences")
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .disable_help_subcommand(true)
        .subcommand_value_name("COMMAND");

    cmd = add_global_args(cmd);

    cmd = cmd.subcommand(command_help());

    cmd = cmd.subcommand(command_bases(show_all));
    cmd = cmd.subcommand(command_compare(show_all));
    cmd = cmd.subcommand(command_apply(show_all));
    cmd = cmd.subcommand(command_export(show_all));
    cmd = cmd.subcommand(command_init(show_all));
    cmd = cmd.subcommand(command_config(show_all));

    cmd = cmd.subcommand(command_completions(show_all));

    cmd
}

pub fn parse_args() -> CliArgs {
    let matches = build_cli(false).get_matches();
    parse_matches(&matches)
}

fn add_global_args(cmd: Command) -> Command {
    let cmd = cmd
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .global(true)
                .help("Override config file location"),
        )
        .arg(
            Arg::new("env-file")
                .long("env-file")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .global(true)
                .help("Load environment variables from file (default: .env)"),
        );

    let cmd = add_side_args(cmd, Side::Source);
    let cmd = add_side_args(cmd, Side::Target);

    cmd.arg(
        Arg::new("api-version")
            .long("api-version")
            .value_name("VERSION")
            .value_parser(["v2", "v3"])
            .global(true)
            .help("NocoDB API version for both sides (default: v2)"),
    )
    .arg(
        Arg::new("timeout")
            .long("timeout")
            .value_name("MS")
            .value_parser(clap::value_parser!(u64))
            .global(true)
            .help("HTTP request timeout in milliseconds (0 = none)"),
    )
    .arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Output as JSON"),
    )
    .arg(
        Arg::new("markdown")
            .long("markdown")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Force markdown table output"),
    )
    .arg(
        Arg::new("pretty")
            .long("pretty")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Force pretty-printed table output"),
    )
    .arg(
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true)
            .help("Increase log verbosity (-v info, -vv debug, -vvv trace)"),
    )
    .arg(
        Arg::new("quiet")
            .short('q')
            .long("quiet")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Suppress non-error output"),
    )
}

fn add_side_args(cmd: Command, side: Side) -> Command {
    let (name, url, token, base) = match side {
        Side::Source => ("source", "source-url", "source-token", "source-base"),
        Side::Target => ("target", "target-url", "target-token", "target-base"),
    };
    cmd.arg(
        Arg::new(name)
            .long(name)
            .value_name("ENV")
            .global(true)
            .help(format!("Config environment to use as the {}", name)),
    )
    .arg(
        Arg::new(url)
            .long(url)
            .value_name("URL")
            .value_hint(ValueHint::Url)
            .global(true)
            .help(format!("NocoDB base URL of the {}", name)),
    )
    .arg(
        Arg::new(token)
            .long(token)
            .value_name("TOKEN")
            .global(true)
            .help(format!("API token of the {}", name)),
    )
    .arg(
        Arg::new(base)
            .long(base)
            .value_name("BASE_ID")
            .global(true)
            .help(format!("Base id of the {}", name)),
    )
}

fn command_help() -> Command {
    Command::new("help")
        .about("Show help for commands")
        .arg(
            Arg::new("all")
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Show all commands, including advanced ones"),
        )
        .arg(Arg::new("command").value_name("COMMAND"))
}

fn command_core(
    name: &'static str,
    about: &'static str,
    aliases: &'static [&'static str],
    _show_all: bool,
) -> Command {
    let mut cmd = Command::new(name).about(about);
    for alias in aliases {
        cmd = cmd.visible_alias(*alias);
    }
    cmd
}

fn command_advanced(
    name: &'static str,
    about: &'static str,
    aliases: &'static [&'static str],
    show_all: bool,
) -> Command {
    let mut cmd = Command::new(name).about(about);
    for alias in aliases {
        cmd = cmd.visible_alias(*alias);
    }
    if !show_all {
        cmd = cmd.hide(true);
    }
    cmd
}

fn command_bases(show_all: bool) -> Command {
    command_core("bases", "List bases of an instance", &[], show_all).arg(
        Arg::new("env")
            .long("env")
            .value_name("side")
            .value_parser(["source", "target"])
            .default_value("source")
            .help("Which configured side to query"),
    )
}

fn command_compare(show_all: bool) -> Command {
    command_core(
        "compare",
        "Diff source against target and build a plan",
        &["diff"],
        show_all,
    )
    .arg(
        Arg::new("out")
            .long("out")
            .value_name("file")
            .value_hint(ValueHint::FilePath)
            .help("Write the plan as JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .value_name("file")
            .value_hint(ValueHint::FilePath)
            .help("Write the plan as line-delimited JSON"),
    )
    .arg(
        Arg::new("case-sensitive")
            .long("case-sensitive")
            .action(ArgAction::SetTrue)
            .help("Match table and column titles case-sensitively"),
    )
    .arg(
        Arg::new("include-delete-ops")
            .long("include-delete-ops")
            .action(ArgAction::SetTrue)
            .help("Plan deletions of tables/columns missing from the source"),
    )
    .arg(
        Arg::new("include-system-columns")
            .long("include-system-columns")
            .action(ArgAction::SetTrue)
            .help("Compare system-owned columns too"),
    )
    .arg(
        Arg::new("strict")
            .long("strict")
            .action(ArgAction::SetTrue)
            .help("Also compare column meta and validation rules"),
    )
    .arg(
        Arg::new("exit-code")
            .long("exit-code")
            .action(ArgAction::SetTrue)
            .help("Exit with status 3 when differences are found"),
    )
}

fn command_apply(show_all: bool) -> Command {
    command_core("apply", "Apply plan steps to the target", &[], show_all)
        .arg(
            Arg::new("plan")
                .long("plan")
                .value_name("file")
                .value_hint(ValueHint::FilePath)
                .required(true)
                .help("Plan file (JSON or JSONL)"),
        )
        .arg(
            Arg::new("step")
                .long("step")
                .value_name("id")
                .action(ArgAction::Append)
                .help("Run only this step (repeatable; default: all)"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Order and report steps without calling the API"),
        )
}

fn command_export(show_all: bool) -> Command {
    command_core("export", "Convert a plan to line-delimited JSON", &[], show_all)
        .arg(
            Arg::new("plan")
                .long("plan")
                .value_name("file")
                .value_hint(ValueHint::FilePath)
                .required(true),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("file")
                .value_hint(ValueHint::FilePath)
                .help("Write to file instead of stdout"),
        )
}

fn command_init(show_all: bool) -> Command {
    command_core("init", "Create config file", &[], show_all)
        .arg(
            Arg::new("path")
                .long("path")
                .value_name("path")
                .value_hint(ValueHint::FilePath),
        )
        .arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
}

fn command_config(show_all: bool) -> Command {
    command_core("config", "Display resolved config", &[], show_all)
}

fn command_completions(show_all: bool) -> Command {
    command_advanced("completions", "Generate shell completions", &[], show_all).arg(
        Arg::new("shell")
            .long("shell")
            .value_name("name")
            .value_parser(["bash", "zsh", "fish", "powershell", "elvish"]),
    )
}

fn parse_side(matches: &ArgMatches, side: Side) -> SideFlags {
    let name = side.as_str();
    SideFlags {
        env_name: matches.get_one::<String>(name).cloned(),
        url: matches.get_one::<String>(&format!("{}-url", name)).cloned(),
        token: matches.get_one::<String>(&format!("{}-token", name)).cloned(),
        base_id: matches.get_one::<String>(&format!("{}-base", name)).cloned(),
    }
}

fn parse_matches(matches: &ArgMatches) -> CliArgs {
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let env_file = matches.get_one::<String>("env-file").map(PathBuf::from);
    let source = parse_side(matches, Side::Source);
    let target = parse_side(matches, Side::Target);
    let api_version = matches.get_one::<String>("api-version").cloned();
    let timeout_ms = matches.get_one::<u64>("timeout").copied();
    let output = OutputFlags {
        json: matches.get_flag("json"),
        markdown: matches.get_flag("markdown"),
        pretty: matches.get_flag("pretty"),
    };
    let verbose = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");

    let command = match matches.subcommand() {
        Some(("help", sub_m)) => CommandKind::Help {
            all: sub_m.get_flag("all"),
            command: sub_m.get_one::<String>("command").cloned(),
        },
        Some(("bases", sub_m)) => CommandKind::Bases(BasesArgs {
            side: match sub_m.get_one::<String>("env").map(String::as_str) {
                Some("target") => Side::Target,
                _ => Side::Source,
            },
        }),
        Some(("compare", sub_m)) => CommandKind::Compare(CompareArgs {
            out: sub_m.get_one::<String>("out").map(PathBuf::from),
            jsonl: sub_m.get_one::<String>("jsonl").map(PathBuf::from),
            case_sensitive: sub_m.get_flag("case-sensitive"),
            include_delete_ops: sub_m.get_flag("include-delete-ops"),
            include_system_columns: sub_m.get_flag("include-system-columns"),
            strict: sub_m.get_flag("strict"),
            exit_code: sub_m.get_flag("exit-code"),
        }),
        Some(("apply", sub_m)) => CommandKind::Apply(ApplyArgs {
            plan: sub_m
                .get_one::<String>("plan")
                .map(PathBuf::from)
                .unwrap_or_default(),
            steps: sub_m
                .get_many::<String>("step")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            dry_run: sub_m.get_flag("dry-run"),
        }),
        Some(("export", sub_m)) => CommandKind::Export(ExportArgs {
            plan: sub_m
                .get_one::<String>("plan")
                .map(PathBuf::from)
                .unwrap_or_default(),
            out: sub_m.get_one::<String>("out").map(PathBuf::from),
        }),
        Some(("init", sub_m)) => CommandKind::Init(InitArgs {
            path: sub_m.get_one::<String>("path").map(PathBuf::from),
            force: sub_m.get_flag("force"),
        }),
        Some(("config", _)) => CommandKind::Config(ConfigArgs),
        Some(("completions", sub_m)) => CommandKind::Completions(CompletionsArgs {
            shell: sub_m.get_one::<String>("shell").cloned(),
        }),
        _ => CommandKind::Help {
            all: false,
            command: None,
        },
    };

    CliArgs {
        config_path,
        env_file,
        source,
        target,
        api_version,
        timeout_ms,
        output,
        verbose,
        quiet,
        command,
    }
}

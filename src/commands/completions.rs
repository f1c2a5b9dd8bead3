use std::io;

use anyhow::Result;
use clap_complete::{Shell, generate};

use crate::cli::{CompletionsArgs, build_cli};
use crate::error::AppError;

pub fn run(cmd: &CompletionsArgs) -> Result<()> {
    let shell_name = cmd
        .shell
        .as_deref()
        .ok_or_else(|| AppError::validation("--shell is required"))?;

    let shell = match shell_name {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "powershell" => Shell::PowerShell,
        "elvish" => Shell::Elvish,
        _ => {
            return Err(AppError::validation(format!("Unsupported shell: {}", shell_name)).into());
        }
    };

    let mut cli = build_cli(true);
    generate(shell, &mut cli, "ncsync", &mut io::stdout());
    Ok(())
}

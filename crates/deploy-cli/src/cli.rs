//! Command-line surface of the `deploy` client.

use std::io::{self, Write};

use clap::Parser;
use deploy_protocol::CommandKind;

/// Command-line interface for the deployment client.
#[derive(Parser, Debug)]
#[command(name = "deploy", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Runs the command in this process instead of through the server.
    #[arg(long)]
    pub(crate) standalone: bool,
    /// The command to run (for example `deploy` or `listdevices`).
    #[arg(value_name = "COMMAND")]
    pub(crate) command: Option<String>,
    /// Command flags, forwarded verbatim (for example `-bundle MyApp`).
    #[arg(
        value_name = "ARG",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) arguments: Vec<String>,
}

impl Cli {
    /// Command name followed by its flags, as sent on the wire.
    pub(crate) fn command_tokens(&self) -> Vec<String> {
        self.command
            .iter()
            .chain(self.arguments.iter())
            .cloned()
            .collect()
    }
}

pub(crate) fn write_usage(out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "usage: deploy [config flags] [--standalone] <command> [flags...]"
    )?;
    writeln!(out)?;
    writeln!(out, "commands:")?;
    for name in CommandKind::names() {
        writeln!(out, "  {name}")?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "flags: -bundle <id> -manifest <file> -file <path> -ipa <path> -device <id>"
    )?;
    writeln!(
        out,
        "       -param <value> -timeout <ms> -nokeepalive"
    )?;
    out.flush()
}

//! Client runtime for the deployment server.
//!
//! Parses the command line, loads configuration, then either runs the
//! command in-process (`--standalone`) or hands it to a `deployd` instance,
//! starting or replacing one as needed. Configuration loading, server launch
//! and the IO streams can all be substituted by tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::str::FromStr;

use clap::Parser;
use clap::error::ErrorKind;
use deploy_config::{Config, RuntimePaths, resolve_server_root};
use deploy_protocol::{CommandKind, CommandRequest};
use deployd::NoopDeployer;

mod cli;
mod config;
mod driver;
mod errors;
mod lifecycle;
mod transport;

use cli::{Cli, write_usage};
use config::{ConfigArgumentSplit, command_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use driver::{ClientDriver, exit_code};
pub(crate) use errors::AppError;
use lifecycle::{LaunchPlan, RetryPolicy, ServerLauncher, SystemLauncher};

/// Writers used by the client runtime.
pub(crate) struct IoStreams<'a> {
    pub(crate) stdout: &'a mut dyn Write,
    pub(crate) stderr: &'a mut dyn Write,
}

/// Runs the client with the process arguments, writing to the given streams.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams { stdout, stderr };
    run_with(args, &mut io, &OrthoConfigLoader, |plan| {
        Box::new(SystemLauncher::new(plan))
    })
}

pub(crate) fn run_with<I, F>(
    args: I,
    io: &mut IoStreams<'_>,
    loader: &dyn ConfigLoader,
    make_launcher: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    F: FnOnce(LaunchPlan) -> Box<dyn ServerLauncher>,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&args, io, loader, make_launcher) {
        Ok(code) => code,
        Err(error) => {
            let _ = writeln!(io.stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<F>(
    args: &[OsString],
    io: &mut IoStreams<'_>,
    loader: &dyn ConfigLoader,
    make_launcher: F,
) -> Result<ExitCode, AppError>
where
    F: FnOnce(LaunchPlan) -> Box<dyn ServerLauncher>,
{
    let split = split_config_arguments(args);
    let cli = match Cli::try_parse_from(command_arguments(args, &split)) {
        Ok(cli) => cli,
        Err(error)
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            write!(io.stdout, "{error}").map_err(AppError::Output)?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(error) => return Err(AppError::CliUsage(error)),
    };

    let Some(command) = cli.command.as_deref() else {
        write_usage(&mut *io.stdout).map_err(AppError::Output)?;
        return Ok(ExitCode::SUCCESS);
    };
    let Ok(kind) = CommandKind::from_str(command) else {
        writeln!(io.stderr, "error: unknown command '{command}'").map_err(AppError::Output)?;
        write_usage(&mut *io.stderr).map_err(AppError::Output)?;
        return Ok(ExitCode::FAILURE);
    };

    let tokens = cli.command_tokens();
    if cli.standalone {
        let success = deployd::run_local_instance(&tokens, &NoopDeployer::new(), &mut *io.stdout)?;
        return Ok(exit_code(success));
    }
    // A request the server cannot parse would never be answered.
    CommandRequest::from_tokens(&tokens)?;

    let config = loader.load(&split.config_arguments)?;
    let paths = RuntimePaths::from_config(&config)?;
    let expected_identity = resolve_server_root(&config)?.into_string();
    let plan = LaunchPlan {
        addr: config.listen_addr(),
        server_arguments: server_arguments(&split, &config, &expected_identity),
        paths,
        binary_override: None,
        retry: RetryPolicy::default(),
    };

    let mut launcher = make_launcher(plan);
    ClientDriver::new(config.listen_addr(), &expected_identity, launcher.as_mut())
        .run(kind, &tokens, io)
}

/// Arguments for a spawned server: the client's configuration flags, plus
/// the identity the client expects when none was configured explicitly.
fn server_arguments(
    split: &ConfigArgumentSplit,
    config: &Config,
    expected_identity: &str,
) -> Vec<OsString> {
    let mut arguments = split.forwarded().to_vec();
    if config.server_root().is_none() {
        arguments.push(OsString::from("--server-root"));
        arguments.push(OsString::from(expected_identity));
    }
    arguments
}

#[cfg(test)]
mod tests;

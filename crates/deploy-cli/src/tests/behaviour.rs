//! Behavioural tests driving the client against scripted servers.

use std::cell::RefCell;
use std::ffi::OsString;
use std::net::TcpListener;
use std::process::ExitCode;
use std::rc::Rc;

use camino::Utf8PathBuf;
use deploy_config::Config;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use super::support::{FakeLauncher, FakeServer, LauncherLog, ServerScript};
use crate::config::ConfigLoader;
use crate::{AppError, IoStreams, run_with};

const CLIENT_IDENTITY: &str = "/opt/deploy/client-tests";

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct ClientWorld {
    runtime: TempDir,
    port: u16,
    server: Option<FakeServer>,
    launcher: Rc<RefCell<LauncherLog>>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<ExitCode>,
}

impl ClientWorld {
    fn new() -> Self {
        Self {
            runtime: TempDir::new().expect("runtime dir"),
            port: 0,
            server: None,
            launcher: Rc::new(RefCell::new(LauncherLog::default())),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        }
    }

    fn config(&self) -> Config {
        let runtime = Utf8PathBuf::from_path_buf(self.runtime.path().to_path_buf())
            .expect("utf-8 runtime dir");
        Config {
            port: self.port,
            server_root: Some(Utf8PathBuf::from(CLIENT_IDENTITY)),
            runtime_dir: Some(runtime),
            ..Config::default()
        }
    }

    fn run(&mut self, command: &str) {
        let args: Vec<OsString> = std::iter::once("deploy")
            .chain(command.split_whitespace())
            .map(OsString::from)
            .collect();
        let loader = StaticConfigLoader {
            config: self.config(),
        };
        let log = Rc::clone(&self.launcher);
        let script = ServerScript::new(CLIENT_IDENTITY, "launched", "ok");
        let mut io = IoStreams {
            stdout: &mut self.stdout,
            stderr: &mut self.stderr,
        };
        let exit = run_with(args, &mut io, &loader, move |_plan| {
            Box::new(FakeLauncher::new(script, log))
        });
        self.exit_code = Some(exit);
    }

    fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }
}

fn free_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe");
    listener.local_addr().expect("probe addr").port()
}

fn parse_count(raw: &str) -> usize {
    raw.parse().expect("count should be numeric")
}

#[fixture]
fn world() -> RefCell<ClientWorld> {
    RefCell::new(ClientWorld::new())
}

#[given("a running server identified as \"{identity}\" that prints \"{line}\" and reports \"{status}\"")]
fn given_running_server(
    world: &RefCell<ClientWorld>,
    identity: String,
    line: String,
    status: String,
) {
    let server =
        FakeServer::spawn(ServerScript::new(&identity, &line, &status)).expect("fake server");
    let mut world = world.borrow_mut();
    world.port = server.addr().port();
    world.server = Some(server);
}

#[given("no server is running")]
fn given_no_server(world: &RefCell<ClientWorld>) {
    world.borrow_mut().port = free_port();
}

#[when("the operator runs \"{command}\"")]
fn when_operator_runs(world: &RefCell<ClientWorld>, command: String) {
    world.borrow_mut().run(&command);
}

#[then("the client exits with code \"{code}\"")]
fn then_exit_code(world: &RefCell<ClientWorld>, code: String) {
    let expected = ExitCode::from(code.parse::<u8>().expect("numeric exit code"));
    assert_eq!(world.borrow().exit_code, Some(expected));
}

#[then("stdout is \"{expected}\"")]
fn then_stdout_is(world: &RefCell<ClientWorld>, expected: String) {
    assert_eq!(world.borrow().stdout_text(), format!("{expected}\n"));
}

#[then("stdout contains \"{snippet}\"")]
fn then_stdout_contains(world: &RefCell<ClientWorld>, snippet: String) {
    let stdout = world.borrow().stdout_text();
    assert!(stdout.contains(&snippet), "stdout {stdout:?} lacks {snippet:?}");
}

#[then("stderr contains \"{snippet}\"")]
fn then_stderr_contains(world: &RefCell<ClientWorld>, snippet: String) {
    let stderr = world.borrow().stderr_text();
    assert!(stderr.contains(&snippet), "stderr {stderr:?} lacks {snippet:?}");
}

#[then("the server received \"{request}\"")]
fn then_server_received(world: &RefCell<ClientWorld>, request: String) {
    let mut world = world.borrow_mut();
    let server = world.server.as_mut().expect("server should be running");
    assert_eq!(server.take_requests().expect("requests"), vec![request]);
}

#[then("the launcher killed servers \"{count}\" times")]
fn then_kill_count(world: &RefCell<ClientWorld>, count: String) {
    assert_eq!(world.borrow().launcher.borrow().kills, parse_count(&count));
}

#[then("the launcher started \"{count}\" servers")]
fn then_launch_count(world: &RefCell<ClientWorld>, count: String) {
    assert_eq!(world.borrow().launcher.borrow().launches, parse_count(&count));
}

#[then("the started server received \"{request}\"")]
fn then_started_server_received(world: &RefCell<ClientWorld>, request: String) {
    let world = world.borrow();
    let mut log = world.launcher.borrow_mut();
    let server = log.launched.last_mut().expect("a server should have started");
    assert_eq!(server.take_requests().expect("requests"), vec![request]);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "A successful command exits cleanly"
)]
fn successful_command(world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "A failed command exits with failure"
)]
fn failed_command(world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "A reply without a marker is a failure"
)]
fn reply_without_marker(world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "Device output ends when the server closes"
)]
fn device_output_ends(world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "Stopping with no server running"
)]
fn stop_without_server(world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "A missing server is started on demand"
)]
fn server_started_on_demand(world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "A server for another root is replaced"
)]
fn foreign_server_replaced(world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_commands.feature",
    name = "Listing devices skips the identity check"
)]
fn listdevices_skips_identity(world: RefCell<ClientWorld>) {
    drop(world);
}


use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match deployd::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "deployd: {error}");
            ExitCode::FAILURE
        }
    }
}

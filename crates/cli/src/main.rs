use std::process::ExitCode;

fn main() -> ExitCode {
    reforma_cli::run()
}

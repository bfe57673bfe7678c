use std::process::ExitCode;

fn main() -> ExitCode {
    paintvox_cli::run()
}

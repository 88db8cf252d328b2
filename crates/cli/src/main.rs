use std::process::ExitCode;

fn main() -> ExitCode {
    lendbot_cli::run()
}

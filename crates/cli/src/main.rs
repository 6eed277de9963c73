use std::process::ExitCode;

fn main() -> ExitCode {
    evaka_finance_cli::run()
}

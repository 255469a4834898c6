use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    till_cli::run()
}

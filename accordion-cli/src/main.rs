use std::process::ExitCode;

use accordion_cli::{is_error_silent, shell};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = accordion_cli::run().await {
        if !is_error_silent(&err) {
            shell().error(format!("{err:#}"));
        }
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

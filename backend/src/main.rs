use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match fareguide_backend::start_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fareguide failed to start: {err}");
            ExitCode::FAILURE
        }
    }
}

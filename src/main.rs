use std::process::ExitCode;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before logging so RUST_LOG from .env applies.
    let dotenv = dotenvy::dotenv();
    let _guard = ticketing_backend::init_logging();

    if let Err(e) = dotenv
        && !e.not_found() {
        warn!("Could not read .env: {}", e);
    }

    match ticketing_backend::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Startup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

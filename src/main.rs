use keyrelay::config::load_config;
use keyrelay::{Config, RelayServer};
use std::process::ExitCode;

/// Runs the relay. An optional first argument names a TOML configuration
/// file; otherwise configuration comes from the environment.
#[tokio::main]
async fn main() -> ExitCode {
    keyrelay::use_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(path),
        None => Config::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    #[cfg(feature = "metrics")]
    keyrelay::describe_metrics();

    let server = match RelayServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

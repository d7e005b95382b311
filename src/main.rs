//! Calico upgrade tool
//!
//! Provides the `abort` command for rolling back a Calico v1 to v3 data upgrade

// calico-upgrade/src/main.rs
mod abort;
mod cli;
mod clients;
mod config;
mod errors;
mod logging;
mod migrator;
mod utils;

use cli::{Commands, Invocation};
use std::process::ExitCode;

/// Main entry point for the upgrade tool
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A .env file may carry the datastore environment variables.
    dotenv::dotenv().ok();

    let cli = match cli::resolve(std::env::args_os()) {
        Invocation::Run(cli) => cli,
        Invocation::Exit(code) => return ExitCode::from(code),
    };

    if let Err(e) = logging::init_logging(&cli.log_level) {
        eprintln!("❌ Error: {:?}", e);
        return ExitCode::FAILURE;
    }

    match cli.command {
        Commands::Abort(options) => {
            let completion = abort::run_abort_flow(&options).await;
            ExitCode::from(completion.exit_code())
        }
    }
}

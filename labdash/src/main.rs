//! labdash entry point

use clap::Parser;
use labdash::cli::{check, serve, Cli, Commands};
use labdash::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve(args)) => serve::execute(&args).await,
        Some(Commands::Check(args)) => check::execute(&args).await,
        // No subcommand - default to serve
        None => serve::execute(&serve::ServeArgs::default()).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "labdash exited with an error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

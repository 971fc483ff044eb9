//! `newsagg` command-line client.

use clap::Parser;
use newsagg_client::ClientConfig;
use newsagg_sync::telemetry::init_tracing;
use newsagg_sync::{App, AppError, Cli};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref())?;
    let mut app = App::from_config(&config)?;

    match app.run(cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}

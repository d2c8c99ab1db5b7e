use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tripflow_api_client::TripApiClient;
use tripflow_cli::{Cli, Flow, ReplCommand, execute, render_notices, render_status, render_view};
use tripflow_client_core::controller::TripController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings().context("resolve server settings")?;
    info!(
        base_url = %settings.base_url,
        source = %settings.base_url_source,
        timeout_ms = settings.timeout_ms,
        "tripflow client starting"
    );
    let client = TripApiClient::from_settings(&settings).context("build http client")?;
    let mut controller = TripController::new(client);

    if let Err(error) = controller.start().await {
        warn!(%error, "continuing as guest");
    }

    let mut stdout = std::io::stdout();
    write!(
        stdout,
        "{}{}{}",
        render_status(controller.state()),
        render_notices(&controller.take_notices()),
        render_view(controller.state())
    )?;
    stdout.flush()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match ReplCommand::parse_line(&line) {
            Ok(command) => command,
            Err(error) => {
                write!(stdout, "{}", error.render())?;
                stdout.flush()?;
                continue;
            }
        };
        let step = execute(&mut controller, command).await;
        write!(stdout, "{}", step.output)?;
        stdout.flush()?;
        if step.flow == Flow::Quit {
            break;
        }
    }

    Ok(())
}

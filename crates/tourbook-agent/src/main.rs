//! Tourbook analytics agent entry point.
//!
//! Reads newline-delimited JSON interaction events from stdin and delivers
//! them to the analytics backend. End of input or Ctrl-C counts as unload.

use std::error::Error;

use tokio::io::BufReader;
use tourbook_agent::agent::Agent;
use tourbook_agent::config::AgentConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Tourbook analytics agent");

    // Read configuration from environment.
    let config = AgentConfig::from_env()?;

    let agent = Agent::start(&config)?;

    let consumed = tokio::select! {
        result = agent.consume(BufReader::new(tokio::io::stdin())) => result.map(Some),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            Ok(None)
        }
    };
    match &consumed {
        Ok(Some(stats)) => tracing::info!(
            tracked = stats.tracked,
            dropped = stats.dropped,
            malformed = stats.malformed,
            "input finished"
        ),
        Ok(None) => {}
        Err(err) => tracing::error!(error = %err, "reading input failed"),
    }

    // Queued events get their final flush attempt even when input failed.
    let undelivered = agent.shutdown().await?;
    tracing::info!(undelivered, "Tourbook analytics agent stopped");
    consumed?;

    Ok(())
}

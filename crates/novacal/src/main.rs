//! novacal: natural-language Google Calendar assistant
//!
//! Usage:
//!   novacal                    - Start interactive CLI mode
//!   novacal --serve            - Start the HTTP API
//!   novacal --execute <prompt> - Run one request and exit
//!   novacal --help             - Show help

mod cli;

use std::sync::Arc;

use novacal_api::AppState;
use novacal_calendar::{bootstrap_credentials, BootstrapOutcome, CalendarAgentFactory, CalendarToolkit};
use novacal_core::{AgentFactory, Config, Session};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Interactive CLI mode
    Cli,
    /// HTTP API
    Serve,
    /// One-shot request
    Execute(String),
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("novacal {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting novacal...");
    tracing::info!("Model: {} ({:?})", config.llm.model, config.llm.provider);

    match bootstrap_credentials(&config.calendar, &config.secrets) {
        Ok(report) => {
            for (name, outcome) in [("credentials", report.credentials), ("token", report.token)] {
                if outcome == BootstrapOutcome::NoSecret {
                    tracing::debug!("No stored secret for calendar {}", name);
                }
            }
        }
        Err(e) => tracing::warn!("Credential bootstrap failed: {}", e),
    }

    let toolkit = Arc::new(
        CalendarToolkit::new(&config.calendar)
            .map_err(|e| anyhow::anyhow!("Failed to create calendar client: {}", e))?,
    );
    let factory: Arc<dyn AgentFactory> =
        Arc::new(CalendarAgentFactory::new(config.clone(), toolkit.clone()));

    let session = if config.llm.api_key.is_empty() {
        Session::new()
    } else {
        Session::with_api_key(config.llm.api_key.clone())
    };

    match mode {
        RunMode::Cli => {
            tracing::info!("Running in CLI mode");
            cli::run_cli(session, factory, toolkit).await
        }
        RunMode::Execute(prompt) => cli::run_execute(session, factory, &prompt).await,
        RunMode::Serve => {
            let port = config.api.port;
            let state = AppState::new(session, factory, &toolkit, config.api.key.clone());
            novacal_api::start_server(port, state).await
        }
        RunMode::Help | RunMode::Version => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<RunMode> {
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--serve" | "-s" => return Ok(RunMode::Serve),
            "--execute" | "-e" => {
                let prompt = args.collect::<Vec<_>>().join(" ");
                if prompt.trim().is_empty() {
                    anyhow::bail!("--execute requires a prompt");
                }
                return Ok(RunMode::Execute(prompt));
            }
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            _ => {}
        }
    }

    Ok(RunMode::Cli)
}

/// Print help message
fn print_help() {
    println!("novacal - natural-language Google Calendar assistant");
    println!();
    println!("Usage:");
    println!("  novacal                     Start interactive CLI mode");
    println!("  novacal --serve             Start the HTTP API");
    println!("  novacal --execute <prompt>  Run one request and exit");
    println!("  novacal --help              Show this help message");
    println!("  novacal --version           Show version");
    println!();
    println!("Configuration is read from ./novacal.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  GOOGLE_API_KEY              Model API key (or LLM_API_KEY)");
    println!("  LLM_MODEL                   Model name (default: gemini-2.5-flash)");
    println!("  LLM_PROVIDER                gemini, openai or claude (default: gemini)");
    println!("  LLM_BASE_URL                Custom API endpoint");
    println!("  CALENDAR_TOKEN_PATH         Authorized-user token file (default: token.json)");
    println!("  GOOGLE_CALENDAR_TOKEN       Token contents written when the file is absent");
    println!("  API_KEY                     Bearer key for the HTTP API (optional)");
    println!("  API_PORT                    HTTP API port (default: 8501)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_is_cli() {
        assert_eq!(parse_args(args(&[])).unwrap(), RunMode::Cli);
    }

    #[test]
    fn test_flags() {
        assert_eq!(parse_args(args(&["--serve"])).unwrap(), RunMode::Serve);
        assert_eq!(parse_args(args(&["-h"])).unwrap(), RunMode::Help);
        assert_eq!(parse_args(args(&["--version"])).unwrap(), RunMode::Version);
    }

    #[test]
    fn test_execute_joins_prompt() {
        assert_eq!(
            parse_args(args(&["--execute", "What's", "on", "today?"])).unwrap(),
            RunMode::Execute("What's on today?".to_string())
        );
        assert!(parse_args(args(&["-e"])).is_err());
    }
}

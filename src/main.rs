use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use owneriq_scorecard::api::run_http_server;
use owneriq_scorecard::client::{ScorecardClient, SessionAuth};
use owneriq_scorecard::core::{ScorecardPayload, derive_scorecard};

#[derive(Parser, Debug)]
#[command(
    name = "owneriq-scorecard",
    about = "Property scorecard metrics engine and API"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scorecard derivation HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Derive a scorecard bundle from a payload JSON file, or stdin when no
    /// file is given.
    Derive { file: Option<PathBuf> },
    /// Fetch a live scorecard payload from the property service and derive it.
    Fetch {
        #[arg(long)]
        base_url: String,
        #[arg(long)]
        property_id: String,
        /// Session access token; omit with --demo to use the demo sentinel.
        #[arg(long)]
        token: Option<String>,
        #[arg(long, default_value_t = false)]
        demo: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(message) = run(Cli::parse()).await {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Derive { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .map_err(|e| format!("failed to read stdin: {e}"))?;
                    buffer
                }
            };
            print_scorecard(&ScorecardPayload::from_json(&raw)?)
        }
        Command::Fetch {
            base_url,
            property_id,
            token,
            demo,
        } => {
            let auth = SessionAuth::resolve(token, demo).map_err(|e| e.to_string())?;
            let client = ScorecardClient::new(&base_url);
            let payload = client
                .fetch_scorecard(&property_id, &auth)
                .await
                .map_err(|e| e.to_string())?;
            print_scorecard(&payload)
        }
    }
}

fn print_scorecard(payload: &ScorecardPayload) -> Result<(), String> {
    let scorecard = derive_scorecard(payload);
    let json = serde_json::to_string_pretty(&scorecard)
        .map_err(|e| format!("failed to encode scorecard: {e}"))?;
    println!("{json}");
    Ok(())
}

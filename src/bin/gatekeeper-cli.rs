use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use route_gatekeeper::errors::{ErrorDetails, Thrown, TransportError};

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Management CLI for the route gatekeeper", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATEKEEPER_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gatekeeper status
    Status,
    /// Show the active public and api route patterns
    Routes,
    /// Show how a path would be gated, without an identity
    Check {
        /// Request path, e.g. /dashboard
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Routes => client.get(format!("{}/admin/routes", cli.url)),
        Commands::Check { path } => client
            .get(format!("{}/admin/check", cli.url))
            .query(&[("path", path)]),
    };

    match request.headers(headers).send().await {
        Ok(res) => print_response(res).await?,
        Err(e) => report(&ErrorDetails::from(&Thrown::from(&e))),
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        // Admin errors already carry ErrorDetails; anything else is wrapped.
        let details = match res.json::<ErrorDetails>().await {
            Ok(details) => details,
            Err(_) => ErrorDetails::from(&TransportError::with_status(status.as_u16(), None)),
        };
        report(&details);
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn report(details: &ErrorDetails) {
    eprintln!("Error: {} ({}, status {})", details.message, details.code, details.status);
    if details.retryable {
        eprintln!("This failure may be transient; retrying could succeed.");
    }
}

//! medragctl library: argument parsing, HTTP client and output rendering.

pub mod cli;
pub mod client;
pub mod errors;
pub mod output;

use anyhow::Result;
use cli::{Cli, Commands};
use client::MedragClient;

/// Execute a parsed command, printing its output
pub async fn run(cli: Cli) -> Result<()> {
    let client = MedragClient::new(&cli.url);

    match cli.command {
        Commands::Health { json } => {
            let health = client.health().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                print!("{}", output::render_health(&health));
            }
        }
        Commands::Query { args, exclude } => {
            let response = client.query(&args.to_request(&exclude)).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", output::render_response(&response));
            }
        }
        Commands::Ablate { args, exclude } => {
            let response = client.ablate(&args.to_request(&exclude)).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", output::render_response(&response));
            }
        }
    }

    Ok(())
}

//! MedRAG Control - CLI client for the MedRAG ProofPath service

use clap::Parser;
use medragctl::cli::Cli;
use medragctl::errors::{exit_code_for, EXIT_SUCCESS};
use owo_colors::OwoColorize;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match medragctl::run(cli).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "[ERROR]".bright_red(), e);
            exit_code_for(&e)
        }
    };

    std::process::exit(code);
}

//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use crate::client::DEFAULT_URL;
use clap::{Args, Parser, Subcommand};
use medrag_shared::query::DEFAULT_TOP_K;
use medrag_shared::QueryRequest;
use std::collections::BTreeMap;

/// MedRAG ProofPath CLI
#[derive(Parser, Debug)]
#[command(name = "medragctl")]
#[command(about = "Query a MedRAG service and inspect its evidence trail", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Base URL of the MedRAG service
    #[arg(long, global = true, default_value = DEFAULT_URL)]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show service health
    Health {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Ask a medical question
    Query {
        #[command(flatten)]
        args: QueryArgs,

        /// Passage or source id to exclude (repeatable)
        #[arg(long = "exclude", value_name = "ID")]
        exclude: Vec<String>,
    },

    /// Re-ask a question with passages excluded (counterfactual)
    Ablate {
        #[command(flatten)]
        args: QueryArgs,

        /// Passage or source id to exclude (repeatable, at least one)
        #[arg(long = "exclude", value_name = "ID", required = true)]
        exclude: Vec<String>,
    },
}

/// Arguments shared by `query` and `ablate`
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Question text
    pub text: String,

    /// Passages to retrieve
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub k: u32,

    /// Generation temperature
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f64,

    /// Multiple-choice option as KEY=VALUE (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// Output JSON only
    #[arg(long)]
    pub json: bool,
}

impl QueryArgs {
    /// Build the wire request
    pub fn to_request(&self, exclude: &[String]) -> QueryRequest {
        let mut request = QueryRequest::new(self.text.clone())
            .with_k(self.k)
            .with_temperature(self.temperature);
        if !self.options.is_empty() {
            let options: BTreeMap<String, String> = self.options.iter().cloned().collect();
            request = request.with_options(options);
        }
        if !exclude.is_empty() {
            request = request.with_exclusions(exclude.iter().cloned());
        }
        request
    }
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let cli = Cli::try_parse_from(["medragctl", "query", "What causes fever?"]).unwrap();
        assert_eq!(cli.url, DEFAULT_URL);
        let Commands::Query { args, exclude } = cli.command else {
            panic!("expected query");
        };
        assert_eq!(args.k, 32);
        assert_eq!(args.temperature, 0.0);
        assert!(exclude.is_empty());

        let request = args.to_request(&exclude);
        assert!(request.ablate.is_none());
        assert!(request.options.is_none());
    }

    #[test]
    fn test_query_with_options() {
        let cli = Cli::try_parse_from([
            "medragctl",
            "--url",
            "http://medrag:9000",
            "query",
            "First line for anaphylaxis?",
            "--option",
            "A=Diphenhydramine",
            "--option",
            "B=Epinephrine IM",
            "--k",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.url, "http://medrag:9000");
        let Commands::Query { args, exclude } = cli.command else {
            panic!("expected query");
        };
        let request = args.to_request(&exclude);
        let options = request.options.unwrap();
        assert_eq!(options["B"], "Epinephrine IM");
        assert_eq!(request.k, 5);
    }

    #[test]
    fn test_ablate_requires_exclude() {
        assert!(Cli::try_parse_from(["medragctl", "ablate", "q"]).is_err());

        let cli = Cli::try_parse_from([
            "medragctl", "ablate", "q", "--exclude", "doc_1", "--exclude", "doc_3",
        ])
        .unwrap();
        let Commands::Ablate { args, exclude } = cli.command else {
            panic!("expected ablate");
        };
        assert_eq!(exclude, vec!["doc_1", "doc_3"]);
        assert_eq!(
            args.to_request(&exclude).ablate,
            Some(vec!["doc_1".to_string(), "doc_3".to_string()])
        );
    }

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("A = yes"),
            Ok(("A".to_string(), "yes".to_string()))
        );
        assert!(parse_option("novalue").is_err());
        assert!(parse_option("=value").is_err());
    }
}

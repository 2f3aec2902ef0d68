use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use fxq::core::RateQueryRequest;
use fxq::core::log::init_logging;
use fxq::{AppCommand, OutputFormat};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current exchange rates against the reference currency
    Rates {
        /// Currency identifiers, e.g. EUR ETH KRW
        #[arg(required_unless_present = "json", conflicts_with = "json")]
        currencies: Vec<String>,

        /// Raw request body, e.g. '{"currencies": ["EUR"], "async_query": true}'
        #[arg(long)]
        json: Option<String>,

        /// Run the query as a background task and poll for the result
        #[arg(long = "async")]
        async_query: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}

fn rates_request(
    currencies: Vec<String>,
    json: Option<String>,
    async_query: bool,
) -> Result<RateQueryRequest> {
    let mut request = match json {
        Some(body) => RateQueryRequest::from_json(&body).context("Failed to parse request body")?,
        None => RateQueryRequest::new(
            currencies.into_iter().map(serde_json::Value::String).collect(),
            false,
        ),
    };
    request.async_query |= async_query;
    Ok(request)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxq::cli::setup::setup(),
        Some(Commands::Rates {
            currencies,
            json,
            async_query,
            format,
        }) => {
            let config_path = cli.config_path.as_deref();
            async {
                let request = rates_request(currencies, json, async_query)?;
                fxq::run_command(AppCommand::Rates { request, format }, config_path).await
            }
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxq::core::{CurrencyIdentifier, ExecutionMode};

    #[test]
    fn test_rates_request_from_positional_currencies() {
        let request = rates_request(vec!["EUR".into(), "ETH".into()], None, false).unwrap();
        assert_eq!(request.mode(), ExecutionMode::Sync);
        assert_eq!(
            request.identifiers(),
            vec![
                CurrencyIdentifier::Valid("EUR".to_string()),
                CurrencyIdentifier::Valid("ETH".to_string())
            ]
        );
    }

    #[test]
    fn test_async_flag_upgrades_json_body() {
        let body = r#"{"currencies": ["EUR"]}"#.to_string();
        let request = rates_request(Vec::new(), Some(body), true).unwrap();
        assert!(request.async_query);
        assert_eq!(request.mode(), ExecutionMode::Async);
        assert_eq!(request.identifiers().len(), 1);
    }

    #[test]
    fn test_json_body_async_flag_is_kept_without_cli_flag() {
        let body = r#"{"currencies": "EUR,KRW", "async_query": true}"#.to_string();
        let request = rates_request(Vec::new(), Some(body), false).unwrap();
        assert_eq!(request.mode(), ExecutionMode::Async);
        assert_eq!(request.identifiers().len(), 2);
    }

    #[test]
    fn test_malformed_json_body_is_reported() {
        let err = rates_request(Vec::new(), Some("{not json".to_string()), false).unwrap_err();
        assert!(err.to_string().contains("Failed to parse request body"));
    }
}

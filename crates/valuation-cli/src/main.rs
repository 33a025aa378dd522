//! Command-line interface for the P/E valuation engine

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use valuation_engine::{InMemoryMarketData, ValuationConfig, ValuationEngine};
use valuation_utils::Config;

#[derive(Parser, Debug)]
#[command(name = "pe-value")]
#[command(about = "Value a stock with P/E multiples from a market data snapshot", long_about = None)]
struct Args {
    /// JSON snapshot with quarterly fundamentals and prices
    #[arg(short, long)]
    data: PathBuf,

    /// Ticker to value
    ticker: String,

    /// Comma separated peer tickers
    #[arg(short, long, value_delimiter = ',')]
    peers: Vec<String>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = Config::default().with_env_overrides();
    valuation_utils::init_tracing_with(&app.log_filter, app.log_format)?;

    let args = Args::parse();

    info!("Starting {} ({})", app.app_name, app.environment);

    let output = run(&args).await?;
    println!("{output}");

    Ok(())
}

async fn run(args: &Args) -> anyhow::Result<String> {
    let raw = tokio::fs::read_to_string(&args.data)
        .await
        .with_context(|| format!("failed to read snapshot {}", args.data.display()))?;
    let market = Arc::new(InMemoryMarketData::from_json_str(&raw)?);
    let config = Arc::new(ValuationConfig::default().with_env_overrides()?);

    let engine = ValuationEngine::new(market.clone(), market, config)?;
    let report = engine
        .compute_valuation(&args.ticker, args.peers.as_slice())
        .await
        .with_context(|| format!("valuation of {} failed", args.ticker))?;

    if args.json {
        Ok(serde_json::to_string_pretty(report.as_ref())?)
    } else {
        Ok(report.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> String {
        concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/snapshot.json").to_string()
    }

    #[test]
    fn test_parse_args() {
        let args =
            Args::try_parse_from(["pe-value", "--data", "s.json", "aapl", "--peers", "MSFT,GOOGL"])
                .unwrap();
        assert_eq!(args.ticker, "aapl");
        assert_eq!(args.peers, vec!["MSFT", "GOOGL"]);
        assert!(!args.json);

        assert!(Args::try_parse_from(["pe-value", "AAPL"]).is_err());
    }

    #[test]
    fn test_summary_output() {
        let args = Args::try_parse_from(["pe-value", "--data", &snapshot(), "AAPL"]).unwrap();
        let output = tokio_test::block_on(run(&args)).unwrap();

        assert!(output.starts_with("AAPL P/E valuation"));
        assert!(output.contains("Fairly Valued"));
    }

    #[test]
    fn test_json_output_with_peers() {
        let args = Args::try_parse_from([
            "pe-value",
            "--data",
            &snapshot(),
            "--json",
            "AAPL",
            "-p",
            "msft,googl",
        ])
        .unwrap();
        let output = tokio_test::block_on(run(&args)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["peer_comparison"]["status"], "available");
        assert_eq!(json["peer_comparison"]["peers"][0]["ticker"], "MSFT");
        assert_eq!(json["peer_comparison"]["dropped"][0]["ticker"], "GOOGL");
    }

    #[test]
    fn test_missing_snapshot() {
        let args = Args::try_parse_from(["pe-value", "--data", "/nonexistent.json", "AAPL"]).unwrap();
        let err = tokio_test::block_on(run(&args)).unwrap_err();
        assert!(err.to_string().contains("failed to read snapshot"));
    }
}

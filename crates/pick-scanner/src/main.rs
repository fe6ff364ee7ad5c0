//! pick-scanner: run one of the pick pipelines and print the result as JSON.
//!
//! Usage:
//!   cargo run -p pick-scanner -- top-picks
//!   cargo run -p pick-scanner -- value-picks
//!   cargo run -p pick-scanner -- movers
//!   cargo run -p pick-scanner -- chart AAPL 3month
//!   cargo run -p pick-scanner -- top-picks --compact

use analysis_core::{ChartSpan, SystemClock};
use anyhow::{Context, Result};
use market_data_client::{default_indices, IndexListClient, MarketDataClient, MarketDataConfig};
use pick_engine::{chart_snapshot, EngineConfig, MoversPipeline, PickEngine};
use serde::Serialize;
use std::sync::Arc;

const DEFAULT_LOG_FILTER: &str = "pick_scanner=info,pick_engine=info,market_data_client=warn";

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    // Logs go to stderr so stdout stays valid JSON
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  pick-scanner top-picks              Ranked recovery candidates");
    eprintln!("  pick-scanner value-picks            Deepest drawdowns with fundamentals");
    eprintln!("  pick-scanner movers                 Today's gainers per index");
    eprintln!("  pick-scanner chart SYMBOL [SPAN]    Price history (day|week|month|3month|year|5year)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --compact    Single-line JSON output");
}

fn emit<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Command {
    TopPicks,
    ValuePicks,
    Movers,
    Chart { symbol: String, span: ChartSpan },
}

impl Command {
    fn parse(positional: &[&str]) -> Result<Self> {
        match positional {
            ["top-picks", ..] => Ok(Command::TopPicks),
            ["value-picks", ..] => Ok(Command::ValuePicks),
            ["movers", ..] => Ok(Command::Movers),
            ["chart", symbol, rest @ ..] => Ok(Command::Chart {
                symbol: symbol.to_string(),
                span: rest.first().map(|s| ChartSpan::parse(s)).unwrap_or(ChartSpan::Year),
            }),
            ["chart"] => anyhow::bail!("chart requires a SYMBOL"),
            [other, ..] => anyhow::bail!("Unknown command: {}", other),
            [] => anyhow::bail!("No command given"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let compact = args.iter().any(|a| a == "--compact");
    let positional: Vec<&str> = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(|s| s.as_str())
        .collect();

    let command = match Command::parse(&positional) {
        Ok(command) => command,
        Err(e) => {
            tracing::error!("{}", e);
            print_usage();
            std::process::exit(1);
        }
    };
    tracing::info!("Running {:?}", command);

    if let Err(e) = run(command, compact).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command, compact: bool) -> Result<()> {
    let config = EngineConfig::from_env().context("Invalid engine configuration")?;
    let provider = Arc::new(MarketDataClient::new(MarketDataConfig::from_env()));
    let source = Arc::new(IndexListClient::new());
    let clock = Arc::new(SystemClock);

    let engine = PickEngine::new(config, default_indices(), provider, source, clock);

    match command {
        Command::TopPicks => {
            let result = engine.top_picks_or_stale().await.context("Top picks failed")?;
            emit(&result, compact)?;
        }
        Command::ValuePicks => {
            let result = engine.value_picks_or_stale().await.context("Value picks failed")?;
            emit(&result, compact)?;
        }
        Command::Movers => {
            let pipeline = MoversPipeline::new(
                engine.resolver(),
                engine.clock(),
                engine.indices().to_vec(),
                engine.config().min_gain_percent,
            );
            emit(&pipeline.run().await, compact)?;
        }
        Command::Chart { symbol, span } => {
            let provider = engine.provider();
            let clock = engine.clock();
            let snapshot = chart_snapshot(provider.as_ref(), clock.as_ref(), &symbol, span)
                .await
                .with_context(|| format!("Chart for {} failed", symbol))?;
            emit(&snapshot, compact)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&["top-picks"]).unwrap(), Command::TopPicks);
        assert_eq!(Command::parse(&["value-picks"]).unwrap(), Command::ValuePicks);
        assert_eq!(Command::parse(&["movers"]).unwrap(), Command::Movers);
        assert_eq!(
            Command::parse(&["chart", "AAPL", "3month"]).unwrap(),
            Command::Chart { symbol: "AAPL".into(), span: ChartSpan::ThreeMonth }
        );
        assert_eq!(
            Command::parse(&["chart", "MSFT"]).unwrap(),
            Command::Chart { symbol: "MSFT".into(), span: ChartSpan::Year }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse(&[]).is_err());
        assert!(Command::parse(&["chart"]).is_err());
        let err = Command::parse(&["sideways"]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: sideways");
    }
}

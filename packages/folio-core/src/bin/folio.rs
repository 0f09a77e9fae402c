//! Folio CLI - portfolio analytics over CSV holdings and prices.
//!
//! Every command prints an `ApiResponse` JSON document on stdout; logs go to
//! stderr so the output stays machine-readable.

use clap::{Parser, Subcommand};
use folio_core::{
    io, pipeline, portfolio, AnalyticsConfig, ApiResponse, HoldingsLedger, PriceHistory,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio portfolio analytics - valuation, performance and risk")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.folio/config.toml or $FOLIO_CONFIG_FILE)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis and export the BI tables
    Analyze {
        #[command(flatten)]
        inputs: Inputs,
        /// Directory receiving the CSV tables
        #[arg(short, long, default_value = "bi_exports")]
        out_dir: PathBuf,
    },
    /// Value the holdings at the latest price date
    Valuation {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Portfolio and per-ticker risk metrics
    Risk {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Reshape a raw wide download into a cleaned price file
    Reshape {
        /// Raw file with ticker and field header rows
        #[arg(short, long)]
        raw: PathBuf,
        /// Tickers expected in the file (comma-separated)
        #[arg(short, long)]
        tickers: String,
        /// Cleaned output file
        #[arg(short, long, default_value = "market_data_clean.csv")]
        out: PathBuf,
    },
}

#[derive(clap::Args)]
struct Inputs {
    /// Holdings CSV
    #[arg(long, default_value = "portfolio_holdings.csv")]
    holdings: PathBuf,
    /// Cleaned prices CSV
    #[arg(long, default_value = "market_data_clean.csv")]
    prices: PathBuf,
}

impl Inputs {
    fn load(&self) -> folio_core::Result<(HoldingsLedger, PriceHistory)> {
        Ok((io::read_holdings(&self.holdings)?, io::read_prices(&self.prices)?))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Analyze { inputs, out_dir } => handle_analyze(&config, &inputs, &out_dir),
        Commands::Valuation { inputs } => handle_valuation(&config, &inputs),
        Commands::Risk { inputs } => handle_risk(&config, &inputs),
        Commands::Reshape { raw, tickers, out } => handle_reshape(&raw, &tickers, &out),
    });

    match result {
        Ok(data) => print_response(&ApiResponse::ok(data), ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{}", e);
            print_response(&ApiResponse::<()>::err(e.to_string()), ExitCode::FAILURE)
        }
    }
}

fn load_config(path: Option<&Path>) -> folio_core::Result<AnalyticsConfig> {
    match path {
        Some(path) => AnalyticsConfig::load_from_path(path),
        None => AnalyticsConfig::load(),
    }
}

fn print_response<T: Serialize>(response: &ApiResponse<T>, code: ExitCode) -> ExitCode {
    match serde_json::to_string_pretty(response) {
        Ok(output) => {
            println!("{}", output);
            code
        }
        Err(e) => {
            eprintln!("failed to encode response: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn handle_analyze(
    config: &AnalyticsConfig,
    inputs: &Inputs,
    out_dir: &Path,
) -> folio_core::Result<Value> {
    let (ledger, prices) = inputs.load()?;
    let (report, written) = pipeline::run_and_export(config, &ledger, &prices, out_dir)?;

    Ok(json!({
        "summary": report.valuation.summary,
        "risk": report.risk,
        "degraded": report.is_degraded(),
        "warnings": report.warnings,
        "files": written,
    }))
}

fn handle_valuation(config: &AnalyticsConfig, inputs: &Inputs) -> folio_core::Result<Value> {
    config.validate()?;
    let (ledger, prices) = inputs.load()?;
    let valuation = portfolio::value_holdings(&ledger, &prices, config.stale_price_policy)?;
    let n = config.ranking_size;

    Ok(json!({
        "summary": valuation.summary,
        "positions": valuation.positions,
        "allocation": valuation.allocation,
        "weights": valuation.position_weights(),
        "top_performers": valuation.top_performers(n),
        "bottom_performers": valuation.bottom_performers(n),
        "largest_positions": valuation.top_positions(n),
        "warnings": valuation.warnings,
    }))
}

fn handle_risk(config: &AnalyticsConfig, inputs: &Inputs) -> folio_core::Result<Value> {
    config.validate()?;
    let (ledger, prices) = inputs.load()?;
    let series = portfolio::reconstruct_series(&ledger, &prices);
    let (summary, mut warnings) = portfolio::risk_summary(&series, config)?;
    let (tickers, ticker_warnings) = portfolio::ticker_risk(&ledger, &prices, config);
    warnings.extend(series.warnings.iter().cloned());
    warnings.extend(ticker_warnings);

    Ok(json!({
        "portfolio": summary,
        "tickers": tickers,
        "partial_dates": series.partial_dates(),
        "warnings": warnings,
    }))
}

fn handle_reshape(raw: &Path, tickers: &str, out: &Path) -> folio_core::Result<Value> {
    let tickers: Vec<&str> = tickers
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    let schema = folio_core::market::WideSchema::ohlcv(&tickers);

    let records = io::read_raw_download(raw, &schema)?;
    io::write_prices(out, &records)?;

    Ok(json!({
        "rows": records.len(),
        "tickers": schema.tickers(),
        "output": out,
    }))
}

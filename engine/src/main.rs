// grid-scout command line entry point
use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::advisory::DeepSeekAdvisor;
use engine::analysis::AgeClassifier;
use engine::config::{advisory_key_from_env, AgeSettings, EngineSettings, ExchangeCredentials};
use engine::connectors::binance::{BinancePublic, BinanceTrading};
use engine::connectors::paper::PaperExchange;
use engine::connectors::{SharedAdvisor, SharedMarketData, SharedTrading, Trading};
use engine::data::YoungSymbolTable;
use engine::services::{AccumulationScanner, GridBot, Scanner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "grid-scout", version, about = "New-listing scanner and grid order bot")]
struct Cli {
    /// JSON settings file layered over the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Replacement young-symbol age table (`kind;pattern;age_days`).
    #[arg(long, global = true)]
    age_table: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank recently listed symbols.
    Scan {
        /// Two monthly candles, 35 daily candles, at most 30 days old.
        #[arg(long)]
        strict: bool,
        /// Follow the ranking with a daily accumulation check, printed as JSON.
        #[arg(long)]
        analyze: bool,
    },
    /// Run the grid bot for one symbol.
    Run {
        #[arg(long)]
        symbol: String,
        /// Single iteration, then exit.
        #[arg(long)]
        once: bool,
        /// Live market data, paper orders.
        #[arg(long)]
        dry_run: bool,
    },
    /// Cancel every open order on a symbol.
    Cancel {
        #[arg(long)]
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = EngineSettings::load(cli.config.as_deref())?;
    let market: SharedMarketData = Arc::new(BinancePublic::new(&settings.exchange)?);

    match cli.command {
        Command::Scan { strict, analyze } => {
            let table = match &cli.age_table {
                Some(path) => YoungSymbolTable::load_from_csv(path)?,
                None => YoungSymbolTable::default(),
            };
            let age_settings = if strict { AgeSettings::strict() } else { settings.age.clone() };
            let classifier = AgeClassifier::new(market.clone(), age_settings, Arc::new(table));
            let scanner = Scanner::new(market.clone(), settings.scan.clone(), classifier);

            let report = scanner.scan().await?;
            println!("{}", report);

            if analyze && !report.profiles.is_empty() {
                let accumulation =
                    AccumulationScanner::new(market, settings.accumulation.clone(), settings.scan.concurrency)
                        .analyze(&report.profiles)
                        .await;
                println!("{}", serde_json::to_string_pretty(&accumulation.analyses)?);
                println!("{}", accumulation);
            }
        }
        Command::Run { symbol, once, dry_run } => {
            let symbol = symbol.to_uppercase();
            let quote_asset = settings.scan.quote_asset.clone();

            // Credentials are checked before anything touches the exchange.
            let advisor: SharedAdvisor =
                Arc::new(DeepSeekAdvisor::new(advisory_key_from_env()?, settings.advisory.clone())?);
            let trading: SharedTrading = if dry_run {
                let paper = PaperExchange::new();
                paper.set_quote_asset(&quote_asset).await;
                paper.set_balance(&quote_asset, settings.bot.paper_quote_balance).await;
                info!(balance = settings.bot.paper_quote_balance, "Dry run: orders go to the paper exchange");
                Arc::new(paper)
            } else {
                Arc::new(BinanceTrading::new(&settings.exchange, ExchangeCredentials::from_env()?)?)
            };

            let bot = GridBot::new(
                &symbol,
                &quote_asset,
                market,
                trading,
                advisor,
                settings.grid.clone(),
                settings.bot.clone(),
            );

            if once {
                let report = bot
                    .run_iteration(1)
                    .await
                    .with_context(|| format!("grid iteration for {} failed", symbol))?;
                println!("{}", report);
            } else {
                let shutdown = async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                };
                let iterations = bot.run_continuous(shutdown, |report| println!("{}", report)).await;
                info!(symbol = %bot.symbol(), iterations, "Grid bot stopped");
            }
        }
        Command::Cancel { symbol } => {
            let symbol = symbol.to_uppercase();
            let trading = BinanceTrading::new(&settings.exchange, ExchangeCredentials::from_env()?)?;
            let cancelled = trading.cancel_open_orders(&symbol).await?;
            println!("Cancelled {} open orders on {}", cancelled, symbol);
        }
    }

    Ok(())
}

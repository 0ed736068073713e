use analysis_orchestrator::{normalize_ticker, AnalysisOrchestrator, BatchReport};
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use yahoo_client::YahooClient;

mod config;
mod render;

use config::DashboardConfig;

const HELP: &str = "\
Commands:
  <TICKERS>       comma-separated list to analyze, e.g. AAPL,MSFT (empty line uses the defaults)
  analyze <TICKERS>
                  same, for lists that collide with a command word, e.g. `analyze list`
  show <TICKER>   debt vs equity chart for an analyzed ticker
  table           print the ratio table again
  list            analyzed tickers
  help            this message
  quit | exit     leave";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Analyze(&'a str),
    Show(&'a str),
    Table,
    List,
    Help,
    Quit,
}

fn parse_command<'a>(line: &'a str, default_tickers: &'a str) -> Command<'a> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "" => Command::Analyze(default_tickers),
        "analyze" if !rest.is_empty() => Command::Analyze(rest),
        "show" if !rest.is_empty() => Command::Show(rest),
        "table" if rest.is_empty() => Command::Table,
        "list" if rest.is_empty() => Command::List,
        "help" | "?" if rest.is_empty() => Command::Help,
        "quit" | "exit" if rest.is_empty() => Command::Quit,
        _ => Command::Analyze(line),
    }
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
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

/// Line printed after a batch, if any.
fn batch_summary(report: &BatchReport) -> Option<String> {
    if report.already_analyzed() {
        Some("All tickers were already analyzed.".to_string())
    } else if !report.failed.is_empty() {
        Some(format!("Failed: {}", report.failed.join(", ")))
    } else {
        None
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush().context("failed to flush stdout")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = DashboardConfig::from_env().context("invalid dashboard configuration")?;
    tracing::info!("Yahoo Finance endpoint: {}", config.yahoo_base_url);
    tracing::info!("Ticker pacing: {}ms", config.ticker_pacing_ms);

    let client = YahooClient::new(config.yahoo()).context("failed to build Yahoo Finance client")?;
    let mut orchestrator = AnalysisOrchestrator::new(Box::new(client)).with_pacing(config.pacing());

    println!("Financial ratio dashboard");
    println!("Default tickers: {}", config.default_tickers);
    println!("{}", HELP);
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_command(&line, &config.default_tickers) {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Table => print!("{}", render::render_table(&orchestrator.ratio_table())),
            Command::List => {
                if orchestrator.cache().is_empty() {
                    println!("No tickers analyzed yet.");
                } else {
                    println!("{}", orchestrator.cache().tickers().collect::<Vec<_>>().join(", "));
                }
            }
            Command::Show(ticker) => match orchestrator.solvency(ticker) {
                Some(breakdown) => print!("{}", render::render_solvency(&breakdown)),
                None => {
                    let ticker = normalize_ticker(ticker).unwrap_or_default();
                    match orchestrator.cache().get(&ticker).and_then(|r| r.error()) {
                        Some(error) => println!("{} has no data: {}", ticker, error),
                        None => println!("{} has not been analyzed yet.", ticker),
                    }
                }
            },
            Command::Analyze(input) => {
                let report = orchestrator
                    .analyze_batch_with_progress(input, |p| {
                        println!("Processing {} ({}/{})", p.ticker, p.position, p.total);
                    })
                    .await;
                if report.requested.is_empty() {
                    println!("No tickers given. Type `help` for commands.");
                } else {
                    if let Some(summary) = batch_summary(&report) {
                        println!("{}", summary);
                    }
                    print!("{}", render::render_table(&orchestrator.ratio_table()));
                }
            }
        }
        prompt()?;
    }

    tracing::info!("Session ended with {} tickers analyzed", orchestrator.cache().len());
    Ok(())
}

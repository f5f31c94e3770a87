//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::env_config_adapter::EnvOverrideConfig;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::jsonl_ledger::{JsonlLedger, JsonlNoTradeLog};
use crate::adapters::price_file_adapter::PriceFileAdapter;
use crate::adapters::tool_adapter::{self, ToolCall};
use crate::domain::config_validation::{build_agent_config, AgentConfig};
use crate::domain::error::TraderError;
use crate::domain::execution::TradeExecutor;
use crate::domain::ohlcv::PriceField;
use crate::domain::portfolio::value_holdings;
use crate::domain::price_oracle::PriceOracle;
use crate::domain::scheduler::SessionSlot;
use crate::domain::session::{Session, SessionReport};
use crate::ports::audit_port::AuditPort;
use crate::ports::ledger_port::LedgerPort;

#[derive(Parser, Debug)]
#[command(name = "papertrader", about = "Paper-trading ledger and trade tools for LLM agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the agent's ledger with its genesis snapshot
    Register {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the sessions still to be processed
    Pending {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run one session, reading JSON tool calls from stdin
    Session {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        hour: Option<u32>,
    },
    /// Print the position summary with a mark-to-market valuation
    Summary {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Look up a price
    Price {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        date: NaiveDate,
        /// Time of day (HH:MM); nearest bar on the date is used
        #[arg(long)]
        time: Option<String>,
        #[arg(long, default_value = "close")]
        field: PriceField,
    },
    /// Start the HTTP tool server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Register { config } => run_register(&config),
        Command::Pending { config } => run_pending(&config),
        Command::Session { config, date, hour } => run_session(&config, date, hour),
        Command::Summary { config } => run_summary(&config),
        Command::Price {
            config,
            symbol,
            date,
            time,
            field,
        } => run_price(&config, &symbol, date, time.as_deref(), field),
        Command::Serve { config } => run_serve(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<EnvOverrideConfig<FileConfigAdapter>, TraderError> {
    let file = FileConfigAdapter::from_file(path)?;
    Ok(EnvOverrideConfig::from_env(file))
}

pub fn load_agent_config(path: &Path, today: NaiveDate) -> Result<AgentConfig, TraderError> {
    eprintln!("Loading config from {}", path.display());
    let config = load_config(path)?;
    build_agent_config(&config, today)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Ledger and no-trade log for the configured signature.
pub fn open_ledger(config: &AgentConfig) -> (JsonlLedger, JsonlNoTradeLog) {
    (
        JsonlLedger::new(&config.ledger_dir, &config.signature, config.registration()),
        JsonlNoTradeLog::new(&config.ledger_dir, &config.signature),
    )
}

pub fn load_oracle(config: &AgentConfig) -> Result<PriceOracle, TraderError> {
    let source = PriceFileAdapter::new(config.price_dir.clone(), config.asset());
    let oracle = PriceOracle::load(&source, &config.universe.symbols, config.price_granularity)?;
    eprintln!(
        "Loaded prices for {} of {} symbols from {}",
        oracle.symbols().len(),
        config.universe.count(),
        config.price_dir.display()
    );
    Ok(oracle)
}

fn run_register(config_path: &Path) -> Result<(), TraderError> {
    let config = load_agent_config(config_path, today())?;
    let (ledger, _) = open_ledger(&config);
    if ledger.register()? {
        eprintln!("Registered {} at {}", config.signature, ledger.path().display());
    } else {
        eprintln!("{} is already registered", config.signature);
    }
    Ok(())
}

fn run_pending(config_path: &Path) -> Result<(), TraderError> {
    let config = load_agent_config(config_path, today())?;
    let (ledger, audit) = open_ledger(&config);
    let slots = config.scheduler().pending(&ledger, &audit)?;
    eprintln!("{} pending session(s) for {}", slots.len(), config.signature);
    for slot in slots {
        println!("{slot}");
    }
    Ok(())
}

fn run_session(config_path: &Path, date: NaiveDate, hour: Option<u32>) -> Result<(), TraderError> {
    let config = load_agent_config(config_path, today())?;
    let (ledger, audit) = open_ledger(&config);
    let oracle = load_oracle(&config)?;
    let slot = SessionSlot { date, hour };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let report = run_session_io(
        &config,
        &ledger,
        &audit,
        &oracle,
        slot,
        stdin.lock(),
        stdout.lock(),
    )?;
    eprintln!(
        "Session {} finished: {} fill(s), {} rejection(s)",
        report.slot, report.fills, report.rejections
    );
    Ok(())
}

/// Run one session over line-delimited tool calls, writing one JSON result
/// per call.
pub fn run_session_io(
    config: &AgentConfig,
    ledger: &dyn LedgerPort,
    audit: &dyn AuditPort,
    oracle: &PriceOracle,
    slot: SessionSlot,
    reader: impl BufRead,
    mut writer: impl Write,
) -> Result<SessionReport, TraderError> {
    config.session_granularity.check_slot(slot)?;
    if !config.asset().is_trading_day(slot.date) {
        warn!(%slot, asset = %config.asset(), "session date is not a trading day");
    }

    let executor = TradeExecutor::new(ledger, oracle, config.asset());
    let mut session = Session::begin(config.signature.clone(), slot);

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => tool_adapter::dispatch(&mut session, &executor, &call)?,
            Err(e) => json!({"error": format!("invalid tool call: {e}")}),
        };
        writeln!(writer, "{result}")?;
    }
    writer.flush()?;

    session.finish(audit)
}

fn run_summary(config_path: &Path) -> Result<(), TraderError> {
    let config = load_agent_config(config_path, today())?;
    let (ledger, _) = open_ledger(&config);
    let summary = ledger
        .summary()?
        .ok_or_else(|| TraderError::ledger(ledger.path(), "ledger is not registered"))?;
    let oracle = load_oracle(&config)?;

    let held: Vec<&str> = summary.holdings.positions().map(|(s, _)| s).collect();
    let prices = oracle.close_prices(&held, summary.latest_date);
    let valuation = value_holdings(
        &summary.holdings,
        &prices,
        config.asset().contract_multiplier(),
    );
    for symbol in &valuation.unpriced {
        eprintln!(
            "Warning: no close price for {symbol} on {}",
            summary.latest_date
        );
    }

    println!("{}", json!({"summary": summary, "valuation": valuation}));
    Ok(())
}

fn run_price(
    config_path: &Path,
    symbol: &str,
    date: NaiveDate,
    time: Option<&str>,
    field: PriceField,
) -> Result<(), TraderError> {
    let config = load_agent_config(config_path, today())?;
    let symbol = symbol.trim().to_uppercase();
    let oracle = load_oracle(&config)?;

    let output = match time {
        Some(raw) => {
            let time = NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| {
                TraderError::ConfigInvalid {
                    section: "price".to_string(),
                    key: "time".to_string(),
                    reason: format!("invalid time '{raw}', expected HH:MM"),
                }
            })?;
            match oracle.price_at_time(&symbol, date, time, field) {
                Ok(price) => json!({
                    "symbol": symbol,
                    "date": date.to_string(),
                    "time": raw,
                    "field": field.to_string(),
                    "price": price,
                }),
                Err(e) => json!({"error": e.to_string(), "symbol": symbol, "date": date.to_string()}),
            }
        }
        None => match oracle.quote(&symbol, date) {
            Ok(bar) => json!({
                "symbol": symbol,
                "date": date.to_string(),
                "ohlcv": bar,
                "bars_on_date": oracle.bars_on_date(&symbol, date).map(|b| b.len()).unwrap_or(0),
            }),
            Err(e) => json!({"error": e.to_string(), "symbol": symbol, "date": date.to_string()}),
        },
    };
    println!("{output}");
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), TraderError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState, TradingDesk};
        use std::net::SocketAddr;

        let config = load_agent_config(config_path, today())?;
        let addr: SocketAddr = config.listen.parse().map_err(|_| TraderError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: format!("'{}' is not a socket address", config.listen),
        })?;

        let (ledger, audit) = open_ledger(&config);
        ledger.register()?;
        let oracle = load_oracle(&config)?;
        let desk = TradingDesk::new(
            config.signature.clone(),
            config.asset(),
            Box::new(ledger),
            Box::new(audit),
            oracle,
        )
        .with_granularity(config.session_granularity);
        let router = build_router(AppState::new(desk));

        eprintln!("Starting tool server for {} on {}", config.signature, addr);
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await
        })?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(TraderError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: "the web feature is required for serve".to_string(),
        })
    }
}

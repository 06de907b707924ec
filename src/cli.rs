//! CLI definition and dispatch.

use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::{CsvPriceFeed, CsvTradeLog, ReplayPrices};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::system_clock::ManualClock;
use crate::domain::config_validation::{
    instrument_section, validate_session_config, validate_sim_config,
};
use crate::domain::engine::{EngineSettings, TradeEngine};
use crate::domain::error::SimError;
use crate::domain::format::{format_currency, format_price};
use crate::domain::instrument::{Instrument, InstrumentConfig, InstrumentSpec, parse_instruments};
use crate::domain::market::{DEFAULT_MAX_MOVE_PCT, RandomWalkMarket};
use crate::domain::schedule::ScheduleTime;
use crate::domain::summary::{InstrumentResult, SessionSummary};
use crate::domain::trade::{Direction, OrderParams};
use crate::ports::clock_port::Clock;
use crate::ports::config_port::ConfigPort;
use crate::ports::trade_log_port::TradeLogPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_TICK_INTERVAL_MS: i64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "futsim", about = "Simulated futures trading desk")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web dashboard with a simulated market
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Drive the engine from a recorded price file
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV with `timestamp,instrument,price` rows
        #[arg(short, long)]
        prices: PathBuf,
        /// Trade log destination
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the instrument table
    Instruments {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(config.as_ref()),
        Command::Replay {
            config,
            prices,
            output,
        } => run_replay(&config, &prices, output.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::Instruments { config } => run_instruments(config.as_ref()),
    }
}

fn fail(err: &SimError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Missing path means an empty config, so every default applies.
pub fn load_optional_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    match path {
        Some(p) => load_config(p),
        None => FileConfigAdapter::from_string("").map_err(|e| fail(&e)),
    }
}

pub fn build_timezone(config: &dyn ConfigPort) -> Result<Tz, SimError> {
    match config
        .get_string("engine", "timezone")
        .filter(|s| !s.trim().is_empty())
    {
        Some(name) => name.trim().parse::<Tz>().map_err(|_| SimError::ConfigInvalid {
            section: "engine".to_string(),
            key: "timezone".to_string(),
            reason: format!("unknown timezone '{}'", name.trim()),
        }),
        None => Ok(chrono_tz::America::New_York),
    }
}

pub fn build_instrument_config(config: &dyn ConfigPort) -> InstrumentConfig {
    Instrument::ALL
        .iter()
        .fold(InstrumentConfig::default(), |acc, &instrument| {
            let section = instrument_section(instrument);
            let base = InstrumentSpec::default_for(instrument);
            let spec = InstrumentSpec {
                instrument,
                point_value: config.get_double(&section, "point_value", base.point_value),
                tick_size: config.get_double(&section, "tick_size", base.tick_size),
                start_price: config.get_double(&section, "start_price", base.start_price),
                volatility: config.get_double(&section, "volatility", base.volatility),
                stop_distance: config.get_double(&section, "stop_distance", base.stop_distance),
                target_distance: config.get_double(
                    &section,
                    "target_distance",
                    base.target_distance,
                ),
            };
            acc.with_spec(spec)
        })
}

pub fn build_engine_settings(config: &dyn ConfigPort) -> Result<EngineSettings, SimError> {
    let quantity = config.get_int("engine", "quantity", 1);
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|&q| q >= 1)
        .ok_or_else(|| SimError::ConfigInvalid {
            section: "engine".to_string(),
            key: "quantity".to_string(),
            reason: "quantity must be at least 1".to_string(),
        })?;
    let schedule_time = match config
        .get_string("engine", "schedule_time")
        .filter(|s| !s.trim().is_empty())
    {
        Some(s) => s.parse()?,
        None => ScheduleTime::default(),
    };
    Ok(EngineSettings {
        quantity,
        schedule_time,
    })
}

pub fn build_market_seed(config: &dyn ConfigPort) -> Option<u64> {
    config
        .get_string("market", "seed")
        .and_then(|s| s.trim().parse().ok())
}

pub fn build_market(config: &dyn ConfigPort, instruments: &InstrumentConfig) -> RandomWalkMarket {
    RandomWalkMarket::new(
        instruments,
        config.get_double("market", "max_move_pct", DEFAULT_MAX_MOVE_PCT),
        build_market_seed(config),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Hand the orders to the engine's scheduler.
    Schedule,
    /// Execute on the first batch where every instrument has a price.
    Execute,
}

/// Orders placed by a replay session, from the `[session]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOrders {
    pub instruments: Vec<Instrument>,
    pub direction: Direction,
    pub mode: SessionMode,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub exit_time: Option<ScheduleTime>,
}

pub fn build_session_orders(config: &dyn ConfigPort) -> Result<SessionOrders, SimError> {
    validate_session_config(config)?;
    let instruments = parse_instruments(&config.get_string("session", "instruments").unwrap_or_default())?;
    let direction: Direction = config
        .get_string("session", "direction")
        .unwrap_or_default()
        .parse()?;
    let mode = match config
        .get_string("session", "mode")
        .map(|m| m.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("execute") => SessionMode::Execute,
        _ => SessionMode::Schedule,
    };
    let exit_time = match config
        .get_string("session", "exit_time")
        .filter(|s| !s.trim().is_empty())
    {
        Some(s) => Some(s.parse()?),
        None => None,
    };
    Ok(SessionOrders {
        instruments,
        direction,
        mode,
        stop_loss: config.get_opt_double("session", "stop_loss"),
        take_profit: config.get_opt_double("session", "take_profit"),
        exit_time,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub batches: usize,
    pub opened: usize,
    pub closed: usize,
}

pub type ReplayEngine = TradeEngine<ReplayPrices, ManualClock>;

/// Apply each batch of prices, then tick once. Orders are placed relative
/// to the first batch's day.
pub fn run_replay_pipeline(
    engine: &mut ReplayEngine,
    feed: &CsvPriceFeed,
    orders: &SessionOrders,
) -> Result<ReplayReport, SimError> {
    let first = feed.batches().first().ok_or_else(|| SimError::Data {
        reason: "price file has no rows".to_string(),
    })?;
    engine.clock_mut().set(first.time);

    let target_exit_time = match orders.exit_time {
        Some(t) => Some(t.on_day_of(&first.time)?),
        None => None,
    };
    let params = OrderParams {
        stop_loss: orders.stop_loss,
        take_profit: orders.take_profit,
        target_exit_time,
    };

    let mut awaiting_execution = false;
    match orders.mode {
        SessionMode::Schedule => engine.schedule(&orders.instruments, orders.direction, params.clone()),
        SessionMode::Execute => awaiting_execution = true,
    }

    let mut report = ReplayReport::default();
    for batch in feed.batches() {
        engine.clock_mut().set(batch.time);
        engine.prices_mut().apply(batch);

        if awaiting_execution {
            match engine.execute_many(&orders.instruments, orders.direction, params.clone()) {
                Ok(trades) => {
                    report.opened += trades.len();
                    awaiting_execution = false;
                }
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
        }

        let tick = engine.tick();
        report.opened += tick.fired.len();
        report.closed += tick.closed.len();
        report.batches += 1;
    }

    if awaiting_execution {
        warn!("replay ended before every instrument had a price; nothing executed");
    }
    if engine.pending().is_some() {
        warn!(at = %engine.settings().schedule_time, "replay ended before the scheduled time");
    }
    Ok(report)
}

fn replay_session(
    config: &FileConfigAdapter,
    prices_path: &PathBuf,
) -> Result<(ReplayEngine, ReplayReport), SimError> {
    let tz = build_timezone(config)?;
    let orders = build_session_orders(config)?;
    let instruments = build_instrument_config(config);
    let settings = build_engine_settings(config)?;
    let feed = CsvPriceFeed::from_path(prices_path, tz)?;
    eprintln!(
        "Replaying {} price batches from {}",
        feed.batches().len(),
        prices_path.display()
    );

    let start = feed
        .batches()
        .first()
        .map(|b| b.time)
        .ok_or_else(|| SimError::Data {
            reason: "price file has no rows".to_string(),
        })?;
    let mut engine = TradeEngine::new(ReplayPrices::new(), ManualClock::new(start), instruments, settings);
    if let Some(seed) = build_market_seed(config) {
        engine = engine.with_seed(seed);
    }
    let report = run_replay_pipeline(&mut engine, &feed, &orders)?;
    Ok((engine, report))
}

fn run_replay(config_path: &PathBuf, prices_path: &PathBuf, output: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_sim_config(&config) {
        return fail(&e);
    }

    let result = replay_session(&config, prices_path);
    let (engine, report) = match result {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    info!(batches = report.batches, opened = report.opened, closed = report.closed, "replay finished");

    if let Some(path) = output {
        let mut log = CsvTradeLog::new(path.clone());
        if let Err(e) = log.write(engine.trades(), engine.instruments()) {
            return fail(&e);
        }
        eprintln!("Trade log written to {}", log.path().display());
    }

    print_summary(&engine.summary(), &InstrumentResult::compute_per_instrument(engine.trades()));
    eprintln!("Clock at end of replay: {}", engine.clock().now());
    ExitCode::SUCCESS
}

fn print_summary(summary: &SessionSummary, per_instrument: &[InstrumentResult]) {
    eprintln!("\n=== Session Summary ===");
    eprintln!("Total P/L:         {}", format_currency(summary.total_pnl));
    eprintln!("Realized P/L:      {}", format_currency(summary.realized_pnl));
    eprintln!("Unrealized P/L:    {}", format_currency(summary.unrealized_pnl));
    eprintln!("Active trades:     {}", summary.active);
    eprintln!("Closed trades:     {}", summary.closed);
    eprintln!("Won / Lost:        {} / {}", summary.won, summary.lost);
    eprintln!("Win rate:          {}%", summary.win_rate_pct);
    eprintln!("Profit factor:     {:.2}", summary.stats.profit_factor);
    eprintln!("Max drawdown:      {}", format_currency(summary.stats.max_drawdown));
    eprintln!("Sharpe (per trade): {:.2}", summary.stats.sharpe_ratio);

    if !per_instrument.is_empty() {
        eprintln!("\nPer-instrument:");
        for r in per_instrument {
            eprintln!(
                "  {:<4} trades={:<3} win={:.0}% pnl={}",
                r.instrument.symbol(),
                r.total_trades,
                r.win_rate() * 100.0,
                format_currency(r.total_pnl)
            );
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_sim_config(&config) {
        return fail(&e);
    }
    if config.get_string("session", "instruments").is_some() {
        match build_session_orders(&config) {
            Ok(orders) => {
                let symbols: Vec<&str> = orders.instruments.iter().map(|i| i.symbol()).collect();
                eprintln!("  session: {} {} ({:?})", orders.direction, symbols.join(", "), orders.mode);
            }
            Err(e) => return fail(&e),
        }
    }

    let settings = match build_engine_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    eprintln!("  schedule time: {}", settings.schedule_time);
    eprintln!("  quantity: {}", settings.quantity);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_instruments(config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_sim_config(&config) {
        return fail(&e);
    }
    let instruments = build_instrument_config(&config);
    println!(
        "{:<6} {:>10} {:>8} {:>12} {:>10} {:>6} {:>7}",
        "symbol", "point", "tick", "start", "vol", "stop", "target"
    );
    for spec in instruments.iter() {
        println!(
            "{:<6} {:>10} {:>8} {:>12} {:>10} {:>6} {:>7}",
            spec.instrument.symbol(),
            format_currency(spec.point_value),
            spec.tick_size,
            format_price(spec, spec.start_price),
            spec.volatility,
            spec.stop_distance,
            spec.target_distance
        );
    }
    ExitCode::SUCCESS
}

fn run_serve(config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_sim_config(&config) {
        return fail(&e);
    }

    #[cfg(feature = "web")]
    {
        match serve(&config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}

#[cfg(feature = "web")]
fn serve(config: &FileConfigAdapter) -> Result<(), SimError> {
    use crate::adapters::system_clock::SystemClock;
    use crate::adapters::web::{AppState, build_router, spawn_ticker};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    let tz = build_timezone(config)?;
    let instruments = build_instrument_config(config);
    let settings = build_engine_settings(config)?;
    let mut market = build_market(config, &instruments);
    market.start();

    let listen = config
        .get_string("web", "listen")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let addr: SocketAddr = listen.trim().parse().map_err(|_| SimError::ConfigInvalid {
        section: "web".to_string(),
        key: "listen".to_string(),
        reason: format!("invalid address '{listen}'"),
    })?;
    let interval_ms = config.get_int("engine", "tick_interval_ms", DEFAULT_TICK_INTERVAL_MS);
    let interval = Duration::from_millis(u64::try_from(interval_ms).unwrap_or(1).max(1));

    let mut engine = TradeEngine::new(market, SystemClock::new(tz), instruments, settings);
    if let Some(seed) = build_market_seed(config) {
        engine = engine.with_seed(seed);
    }
    let engine = Arc::new(Mutex::new(engine));

    let mut state = AppState::new(Arc::clone(&engine), build_market_seed(config));
    state.cors = config.get_bool("web", "cors", true);
    let router = build_router(state);

    eprintln!("Starting web server on http://{addr}");
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let ticker = spawn_ticker(engine, interval);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, timezone = %tz, "listening");
        let served = axum::serve(listener, router).await;
        ticker.abort();
        served
    })?;
    Ok(())
}

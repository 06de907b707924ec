//! CLI integration tests for the replay command orchestration.
//!
//! Tests cover:
//! - Session orders from INI files on disk
//! - Replay pipeline in schedule and execute modes
//! - Exit time resolved against the first price batch
//! - End-to-end `replay` writing a trade log

mod common;

use chrono_tz::America::New_York;
use common::*;
use futsim::adapters::csv_adapter::{CsvPriceFeed, CsvTradeLog};
use futsim::adapters::file_config_adapter::FileConfigAdapter;
use futsim::cli::{self, Cli, Command, SessionMode};
use futsim::domain::error::SimError;
use std::process::ExitCode;

const PRICES: &str = "timestamp,instrument,price\n\
    2024-03-15 12:59:00,NQ,18500\n\
    2024-03-15 12:59:00,ES,5200\n\
    2024-03-15 13:00:00,NQ,18500\n\
    2024-03-15 13:00:00,ES,5200\n\
    2024-03-15 13:05:00,NQ,18465\n\
    2024-03-15 13:05:00,ES,5212.5\n\
    2024-03-15 15:00:00,NQ,18480\n\
    2024-03-15 15:00:00,ES,5215\n";

const SESSION_INI: &str = "[engine]\n\
    timezone = America/New_York\n\
    schedule_time = 13:00\n\
    \n\
    [market]\n\
    seed = 42\n\
    \n\
    [session]\n\
    instruments = NQ, ES\n\
    direction = LONG\n\
    exit_time = 15:00\n";

fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

fn replay_engine() -> cli::ReplayEngine {
    engine_at(ny(0, 0, 0), None, None)
}

fn feed(csv: &str) -> CsvPriceFeed {
    CsvPriceFeed::from_reader(csv.as_bytes(), New_York).unwrap()
}

mod session_orders {
    use super::*;

    #[test]
    fn from_ini_file() {
        let file = write_temp(SESSION_INI, ".ini");
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let orders = cli::build_session_orders(&config).unwrap();
        assert_eq!(orders.instruments, vec![Instrument::NQ, Instrument::ES]);
        assert_eq!(orders.direction, Direction::Long);
        assert_eq!(orders.mode, SessionMode::Schedule);
        assert_eq!(orders.stop_loss, None);
    }

    #[test]
    fn missing_direction_is_an_error() {
        let config = FileConfigAdapter::from_string("[session]\ninstruments = NQ\n").unwrap();
        assert!(matches!(
            cli::build_session_orders(&config),
            Err(SimError::ConfigMissing { key, .. }) if key == "direction"
        ));
    }

    #[test]
    fn unknown_instrument_is_an_error() {
        let config =
            FileConfigAdapter::from_string("[session]\ninstruments = NQ, CL\ndirection = LONG\n")
                .unwrap();
        assert!(cli::build_session_orders(&config).is_err());
    }
}

mod pipeline {
    use super::*;

    fn orders(mode: SessionMode) -> cli::SessionOrders {
        let config = FileConfigAdapter::from_string(SESSION_INI).unwrap();
        cli::SessionOrders {
            mode,
            ..cli::build_session_orders(&config).unwrap()
        }
    }

    #[test]
    fn schedule_mode_fires_at_schedule_time() {
        let mut engine = replay_engine();
        let report = cli::run_replay_pipeline(&mut engine, &feed(PRICES), &orders(SessionMode::Schedule)).unwrap();

        assert_eq!(report.batches, 4);
        assert_eq!(report.opened, 2);
        assert_eq!(report.closed, 2);
        assert!(engine.pending().is_none());

        for trade in engine.trades() {
            assert_eq!(trade.entry_time, ny(13, 0, 0));
            assert_eq!(trade.target_exit_time, Some(ny(15, 0, 0)));
            let exit = trade.exit().unwrap();
            assert_eq!(exit.reason, ExitReason::TimeTarget);
            assert_eq!(exit.time, ny(15, 0, 0));
        }
        assert_eq!(engine.realized_pnl(), -400.0 + 750.0);
    }

    #[test]
    fn stop_loss_closes_before_exit_time() {
        let mut engine = replay_engine();
        let mut orders = orders(SessionMode::Schedule);
        orders.instruments = vec![Instrument::NQ];
        orders.stop_loss = Some(18_470.0);
        let report = cli::run_replay_pipeline(&mut engine, &feed(PRICES), &orders).unwrap();

        assert_eq!(report.opened, 1);
        let exit = engine.trades()[0].exit().unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert_eq!(exit.price, 18_465.0);
        assert_eq!(exit.time, ny(13, 5, 0));
        assert_eq!(exit.pnl, -700.0);
    }

    #[test]
    fn execute_mode_opens_on_first_batch() {
        let mut engine = replay_engine();
        let report = cli::run_replay_pipeline(&mut engine, &feed(PRICES), &orders(SessionMode::Execute)).unwrap();

        assert_eq!(report.opened, 2);
        assert!(engine.trades().iter().all(|t| t.entry_time == ny(12, 59, 0)));
    }

    #[test]
    fn execute_mode_waits_for_every_price() {
        let csv = "timestamp,instrument,price\n\
            2024-03-15 10:00:00,NQ,18500\n\
            2024-03-15 10:01:00,ES,5200\n";
        let mut engine = replay_engine();
        cli::run_replay_pipeline(&mut engine, &feed(csv), &orders(SessionMode::Execute)).unwrap();

        assert_eq!(engine.trades().len(), 2);
        assert!(engine.trades().iter().all(|t| t.entry_time == ny(10, 1, 0)));
        assert!(engine.trades().iter().all(|t| t.is_active()));
    }

    #[test]
    fn empty_feed_is_an_error() {
        let mut engine = replay_engine();
        let result = cli::run_replay_pipeline(
            &mut engine,
            &feed("timestamp,instrument,price\n"),
            &orders(SessionMode::Schedule),
        );
        assert!(matches!(result, Err(SimError::Data { .. })));
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn replay_writes_trade_log() {
        let config = write_temp(SESSION_INI, ".ini");
        let prices = write_temp(PRICES, ".csv");
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("trades.csv");

        let code = cli::run(Cli {
            command: Command::Replay {
                config: config.path().to_path_buf(),
                prices: prices.path().to_path_buf(),
                output: Some(output.clone()),
            },
        });
        assert!(is_success(code));

        let log = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CsvTradeLog::HEADER.join(","));
        assert!(lines[1].contains("NQ,LONG,CLOSED"));
        assert!(lines[1].ends_with("-400.00,-20.00,Time target reached"));
        assert!(lines[2].ends_with("750.00,15.00,Time target reached"));
    }

    #[test]
    fn replay_with_missing_price_file_fails() {
        let config = write_temp(SESSION_INI, ".ini");
        let code = cli::run(Cli {
            command: Command::Replay {
                config: config.path().to_path_buf(),
                prices: "/nonexistent/prices.csv".into(),
                output: None,
            },
        });
        assert!(!is_success(code));
    }

    #[test]
    fn validate_accepts_session_config() {
        let config = write_temp(SESSION_INI, ".ini");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: config.path().to_path_buf(),
            },
        });
        assert!(is_success(code));
    }

    #[test]
    fn validate_rejects_bad_timezone() {
        let config = write_temp("[engine]\ntimezone = Mars/Olympus\n", ".ini");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: config.path().to_path_buf(),
            },
        });
        assert!(!is_success(code));
    }

    #[test]
    fn instruments_runs_without_config() {
        assert!(is_success(cli::run(Cli {
            command: Command::Instruments { config: None },
        })));
    }
}

//! Web server adapter.
//!
//! Serves the HTML dashboard and a JSON API over one shared engine. A
//! background task advances the simulated market and ticks the engine.

mod chart;
mod error;
mod handlers;
mod templates;
mod types;

pub use chart::price_chart_svg;
pub use error::{WebError, status_from_error};
pub use handlers::*;
pub use templates::DashboardView;
pub use types::*;

use axum::{
    Router,
    routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error};

use crate::adapters::system_clock::SystemClock;
use crate::domain::engine::{TickReport, TradeEngine};
use crate::domain::instrument::Instrument;
use crate::domain::market::{RandomWalkMarket, generate_history};
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::clock_port::Clock;

pub type LiveEngine = TradeEngine<RandomWalkMarket, SystemClock>;
pub type SharedEngine = Arc<Mutex<LiveEngine>>;

pub const HISTORY_DAYS: u32 = 365;

pub struct AppState {
    pub engine: SharedEngine,
    /// Simulated daily bars per instrument, generated once at startup.
    pub history: Vec<Vec<OhlcvBar>>,
    pub cors: bool,
}

impl AppState {
    pub fn new(engine: SharedEngine, history_seed: Option<u64>) -> Self {
        let history = match engine.lock() {
            Ok(engine) => {
                let today = engine.clock().now().date_naive();
                Instrument::ALL
                    .iter()
                    .map(|&i| {
                        let mut rng = match history_seed {
                            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i.index() as u64)),
                            None => StdRng::from_entropy(),
                        };
                        generate_history(engine.instruments().spec(i), today, HISTORY_DAYS, &mut rng)
                    })
                    .collect()
            }
            Err(_) => vec![Vec::new(); Instrument::ALL.len()],
        };
        Self {
            engine,
            history,
            cors: true,
        }
    }

    pub fn history(&self, instrument: Instrument) -> &[OhlcvBar] {
        self.history
            .get(instrument.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = state.cors;
    let router = Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/state", get(handlers::api_state))
        .route("/api/prices", get(handlers::api_prices))
        .route(
            "/api/trades",
            get(handlers::list_trades).post(handlers::create_trades),
        )
        .route("/api/trades/{id}/close", post(handlers::close_trade))
        .route("/api/schedule", post(handlers::schedule_trade))
        .route("/api/history/{instrument}", get(handlers::history))
        .route("/api/levels/{instrument}", get(handlers::levels))
        .route("/chart/{file}", get(handlers::chart))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state));

    if cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Step the market, then tick the engine. `None` if the lock is poisoned.
pub fn tick_once(engine: &SharedEngine) -> Option<TickReport> {
    let mut engine = engine.lock().ok()?;
    let now = engine.clock().now();
    engine.prices_mut().step(now);
    Some(engine.tick())
}

pub fn spawn_ticker(engine: SharedEngine, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match tick_once(&engine) {
                Some(report) if !report.is_quiet() => debug!(?report, "tick"),
                Some(_) => {}
                None => {
                    error!("engine lock poisoned, ticker stopping");
                    break;
                }
            }
        }
    })
}

fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}

//! HTTP request handlers for web adapter.
//!
//! Every handler takes the engine lock once, does its work synchronously and
//! releases it before returning.

use askama::Template;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::DateTime;
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::{Arc, MutexGuard};
use tracing::info;

use crate::domain::engine::CloseOutcome;
use crate::domain::format::format_currency;
use crate::domain::instrument::Instrument;
use crate::domain::schedule::resolve_exit_time;
use crate::domain::trade::{Direction, OrderParams, TradeId};
use crate::ports::clock_port::Clock;
use crate::ports::price_port::PriceSource;

use super::chart::price_chart_svg;
use super::templates::DashboardView;
use super::types::*;
use super::{AppState, LiveEngine, WebError, is_htmx_request};

fn lock(state: &AppState) -> Result<MutexGuard<'_, LiveEngine>, WebError> {
    state
        .engine
        .lock()
        .map_err(|_| WebError::internal("engine state unavailable"))
}

/// Validate an order body against the clock's current day.
fn parse_order(
    req: &OrderRequest,
    now: &DateTime<Tz>,
) -> Result<(Vec<Instrument>, Direction, OrderParams), WebError> {
    let mut instruments = Vec::with_capacity(req.instruments.len());
    for symbol in &req.instruments {
        let instrument = Instrument::from_str(symbol)?;
        if !instruments.contains(&instrument) {
            instruments.push(instrument);
        }
    }
    let direction = Direction::from_str(&req.direction)
        .map_err(|_| WebError::bad_request(format!("invalid direction {:?}", req.direction)))?;
    let target_exit_time = match req.exit_time.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => Some(resolve_exit_time(t, now)?),
        _ => None,
    };
    for (name, level) in [("stop_loss", req.stop_loss), ("take_profit", req.take_profit)] {
        if level.is_some_and(|v| !v.is_finite() || v <= 0.0) {
            return Err(WebError::bad_request(format!("{name} must be a positive price")));
        }
    }
    Ok((
        instruments,
        direction,
        OrderParams {
            stop_loss: req.stop_loss,
            take_profit: req.take_profit,
            target_exit_time,
        },
    ))
}

fn prices_response(engine: &LiveEngine) -> PricesResponse {
    let market = engine.prices();
    PricesResponse {
        connected: market.is_connected(),
        last_update: market.last_update().map(|t| t.to_rfc3339()),
        prices: market
            .quotes()
            .iter()
            .map(|q| PriceResponse::new(q, engine.instruments().spec(q.instrument)))
            .collect(),
    }
}

fn trades_response(engine: &LiveEngine) -> Vec<TradeResponse> {
    engine
        .marked_trades()
        .iter()
        .map(TradeResponse::new)
        .collect()
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let engine = lock(&state)?;
    let quotes = engine.prices().quotes();
    let summary = engine.summary();
    let trades = engine.marked_trades();
    let view = DashboardView {
        now: engine.clock().now(),
        connected: engine.prices().is_connected(),
        quotes: &quotes,
        instruments: engine.instruments(),
        summary: &summary,
        trades: &trades,
        pending: engine.pending(),
        schedule_time: engine.settings().schedule_time,
    };

    if is_htmx_request(&headers) {
        Ok(Html(view.fragment()).into_response())
    } else {
        let html = view
            .render()
            .map_err(|e| WebError::internal(format!("template error: {e}")))?;
        Ok(Html(html).into_response())
    }
}

pub async fn api_state(State(state): State<Arc<AppState>>) -> Result<Json<StateResponse>, WebError> {
    let engine = lock(&state)?;
    let now = engine.clock().now();
    let schedule_time = engine.settings().schedule_time;
    let pending = engine.pending().map(|p| {
        let fires_at = schedule_time
            .next_after(&now)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|_| schedule_time.to_string());
        PendingResponse::new(p, fires_at)
    });
    Ok(Json(StateResponse {
        clock: now.to_rfc3339(),
        timezone: now.timezone().to_string(),
        prices: prices_response(&engine),
        summary: SummaryResponse::from(&engine.summary()),
        trades: trades_response(&engine),
        pending,
    }))
}

pub async fn api_prices(State(state): State<Arc<AppState>>) -> Result<Json<PricesResponse>, WebError> {
    let engine = lock(&state)?;
    Ok(Json(prices_response(&engine)))
}

pub async fn list_trades(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TradeResponse>>, WebError> {
    let engine = lock(&state)?;
    Ok(Json(trades_response(&engine)))
}

/// Execute immediately: one trade per instrument, all or nothing. An empty
/// instrument set is a no-op answered with 204.
pub async fn create_trades(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> Result<Response, WebError> {
    let mut engine = lock(&state)?;
    let now = engine.clock().now();
    let (instruments, direction, params) = parse_order(&req, &now)?;
    if instruments.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let trades = engine.execute_many(&instruments, direction, params)?;
    let body: Vec<TradeResponse> = trades
        .iter()
        .map(|t| TradeResponse::new(&engine.mark_trade(t)))
        .collect();
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn close_trade(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CloseResponse>, WebError> {
    let mut engine = lock(&state)?;
    let trade_id = TradeId::from(id.as_str());
    match engine.close(&trade_id) {
        CloseOutcome::Closed { pnl } => Ok(Json(CloseResponse {
            id,
            pnl,
            pnl_formatted: format_currency(pnl),
        })),
        CloseOutcome::NotFound => Err(WebError::not_found(format!("no trade {id}"))),
        CloseOutcome::NotActive => Err(WebError::conflict(format!("trade {id} is not active"))),
        CloseOutcome::PriceUnavailable => {
            Err(WebError::unavailable(format!("no price to close trade {id}")))
        }
    }
}

/// Replace the pending scheduled request. An empty instrument set is a
/// no-op answered with 204.
pub async fn schedule_trade(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> Result<Response, WebError> {
    let mut engine = lock(&state)?;
    let now = engine.clock().now();
    let (instruments, direction, params) = parse_order(&req, &now)?;
    if instruments.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    engine.schedule(&instruments, direction, params);
    info!(instruments = ?instruments, "schedule accepted over http");
    let body = ScheduleResponse {
        instruments: instruments.iter().map(|i| i.to_string()).collect(),
        direction: direction.to_string(),
        fires_at: engine.settings().schedule_time.to_string(),
    };
    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(instrument): Path<String>,
) -> Result<Json<Vec<BarResponse>>, WebError> {
    let instrument = Instrument::from_str(&instrument)?;
    Ok(Json(
        state
            .history(instrument)
            .iter()
            .map(BarResponse::from)
            .collect(),
    ))
}

/// `GET /chart/{instrument}.svg`
pub async fn chart(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Response, WebError> {
    let symbol = file
        .strip_suffix(".svg")
        .ok_or_else(|| WebError::not_found(format!("no chart {file}")))?;
    let instrument = Instrument::from_str(symbol)?;
    let spec = lock(&state)?.instruments().spec(instrument).clone();
    let svg = price_chart_svg(&spec, state.history(instrument));
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

/// Suggested stop-loss and take-profit around the live price.
pub async fn levels(
    State(state): State<Arc<AppState>>,
    Path(instrument): Path<String>,
    Query(query): Query<LevelsQuery>,
) -> Result<Json<LevelsResponse>, WebError> {
    let instrument = Instrument::from_str(&instrument)?;
    let direction = match query.direction.as_deref() {
        Some(d) => Direction::from_str(d)
            .map_err(|_| WebError::bad_request(format!("invalid direction {d:?}")))?,
        None => Direction::Long,
    };
    let engine = lock(&state)?;
    let price = engine
        .prices()
        .current_price(instrument)
        .ok_or_else(|| WebError::unavailable(format!("no price for {instrument}")))?;
    let (stop_loss, take_profit) = engine
        .instruments()
        .spec(instrument)
        .suggest_levels(direction, price);
    Ok(Json(LevelsResponse {
        instrument: instrument.to_string(),
        direction: direction.to_string(),
        price,
        stop_loss,
        take_profit,
    }))
}

pub async fn not_found() -> WebError {
    WebError::not_found("not found")
}

//! HTML dashboard rendering. The full page is an Askama template; the live
//! part is built in `fragment()` so htmx polls can skip the layout.

use askama::Template;
use chrono::DateTime;
use chrono_tz::Tz;

use crate::domain::engine::MarkedTrade;
use crate::domain::format::{format_currency, format_duration, format_points, format_price, format_time};
use crate::domain::instrument::InstrumentConfig;
use crate::domain::market::Quote;
use crate::domain::schedule::{PendingTradeRequest, ScheduleTime};
use crate::domain::summary::SessionSummary;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardView<'a> {
    pub now: DateTime<Tz>,
    pub connected: bool,
    pub quotes: &'a [Quote],
    pub instruments: &'a InstrumentConfig,
    pub summary: &'a SessionSummary,
    pub trades: &'a [MarkedTrade<'a>],
    pub pending: Option<&'a PendingTradeRequest>,
    pub schedule_time: ScheduleTime,
}

impl<'a> DashboardView<'a> {
    /// Live-updating part of the page; re-fetched by htmx every second.
    pub fn fragment(&self) -> String {
        let mut html = String::from("<div id=\"content\">");
        html.push_str(&format!(
            "<p class=\"clock\">{} {} &middot; {}</p>",
            format_time(&self.now),
            self.now.timezone(),
            if self.connected {
                "<span class=\"up\">connected</span>"
            } else {
                "<span class=\"down\">disconnected</span>"
            }
        ));
        html.push_str(&self.prices_table());
        html.push_str(&self.summary_table());
        html.push_str(&self.pending_block());
        html.push_str(&self.trades_table());
        html.push_str("</div>");
        html
    }

    fn prices_table(&self) -> String {
        let mut html = String::from("<h2>Prices</h2><table><tr><th>Instrument</th><th>Price</th><th>Change</th></tr>");
        for quote in self.quotes {
            let spec = self.instruments.spec(quote.instrument);
            let (class, arrow) = if quote.is_up() { ("up", "&#9650;") } else { ("down", "&#9660;") };
            html.push_str(&format!(
                "<tr><td>{}</td><td class=\"{}\">{} {}</td><td class=\"{}\">{}</td></tr>",
                quote.instrument,
                class,
                format_price(spec, quote.price),
                arrow,
                class,
                format_price(spec, quote.price - quote.previous),
            ));
        }
        html.push_str("</table>");
        html
    }

    fn summary_table(&self) -> String {
        let s = self.summary;
        let mut html = String::from("<h2>Summary</h2><table>");
        let rows = [
            ("Total P/L", pnl_cell(s.total_pnl)),
            ("Realized P/L", pnl_cell(s.realized_pnl)),
            ("Unrealized P/L", pnl_cell(s.unrealized_pnl)),
            ("Active trades", s.active.to_string()),
            ("Closed trades", s.closed.to_string()),
            ("Won / Lost", format!("{} / {}", s.won, s.lost)),
            ("Win rate", format!("{}%", s.win_rate_pct)),
            ("Average win", format_currency(s.stats.avg_win)),
            ("Average loss", format_currency(s.stats.avg_loss)),
            ("Largest win", format_currency(s.stats.largest_win)),
            ("Largest loss", format_currency(s.stats.largest_loss)),
            ("Profit factor", format_ratio(s.stats.profit_factor)),
            ("Max drawdown", format_currency(s.stats.max_drawdown)),
            ("Sharpe (per trade)", format!("{:.2}", s.stats.sharpe_ratio)),
        ];
        for (label, value) in rows {
            html.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>", label, value));
        }
        html.push_str("</table>");
        html
    }

    fn pending_block(&self) -> String {
        let Some(pending) = self.pending else {
            return String::new();
        };
        let instruments: Vec<String> = pending.instruments.iter().map(|i| i.to_string()).collect();
        let mut html = format!(
            "<h2>Scheduled</h2><p>{} {} at {}",
            pending.direction,
            instruments.join(", "),
            self.schedule_time
        );
        if let Some(sl) = pending.params.stop_loss {
            html.push_str(&format!(", SL {sl}"));
        }
        if let Some(tp) = pending.params.take_profit {
            html.push_str(&format!(", TP {tp}"));
        }
        if let Some(t) = pending.params.target_exit_time {
            html.push_str(&format!(", exit {}", format_time(&t)));
        }
        html.push_str("</p>");
        html
    }

    fn trades_table(&self) -> String {
        if self.trades.is_empty() {
            return String::from("<h2>Trades</h2><p>No trades yet</p>");
        }
        let mut html = String::from(
            "<h2>Trades</h2><table><tr><th>Instrument</th><th>Side</th><th>Status</th>\
             <th>Entry</th><th>Time</th><th>Price</th><th>P/L</th><th>Points</th>\
             <th>Duration</th><th>Exit</th><th></th></tr>",
        );
        // Newest first.
        for marked in self.trades.iter().rev() {
            let trade = marked.trade;
            let spec = self.instruments.spec(trade.instrument);
            let price = trade
                .exit()
                .map(|e| e.price)
                .or(marked.current_price)
                .map(|p| format_price(spec, p))
                .unwrap_or_else(|| "-".to_string());
            let (pnl, points) = match marked.pnl {
                Some(p) => (pnl_cell(p.currency), format_points(p.points)),
                None => ("-".to_string(), "-".to_string()),
            };
            let end = trade.exit().map(|e| e.time).unwrap_or(self.now);
            let exit = trade
                .exit()
                .map(|e| e.reason.label().to_string())
                .unwrap_or_default();
            let action = if trade.is_active() {
                format!("<button onclick=\"closeTrade('{}')\">Close</button>", trade.id)
            } else {
                String::new()
            };
            html.push_str(&format!(
                "<tr id=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                trade.id,
                trade.instrument,
                trade.direction,
                trade.status(),
                format_price(spec, trade.entry_price),
                format_time(&trade.entry_time),
                price,
                pnl,
                points,
                format_duration(&trade.entry_time, &end),
                exit,
                action,
            ));
        }
        html.push_str("</table>");
        html
    }
}

fn pnl_cell(value: f64) -> String {
    let class = if value >= 0.0 { "up" } else { "down" };
    format!("<span class=\"{}\">{}</span>", class, format_currency(value))
}

fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        "&infin;".to_string()
    } else {
        format!("{value:.2}")
    }
}

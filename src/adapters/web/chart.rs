//! SVG line chart of daily closes.

use crate::domain::format::format_price;
use crate::domain::instrument::InstrumentSpec;
use crate::domain::ohlcv::OhlcvBar;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

pub fn price_chart_svg(spec: &InstrumentSpec, bars: &[OhlcvBar]) -> String {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return empty_chart(spec);
    };

    let min_close = bars.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
    let max_close = bars.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
    let range = (max_close - min_close).max(spec.tick_size);

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let x_scale =
        |i: usize| -> f64 { MARGIN_LEFT + (i as f64 / (bars.len() - 1).max(1) as f64) * plot_width };
    let y_scale =
        |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - min_close) / range) * plot_height };

    let mut path_data = String::new();
    for (i, bar) in bars.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        path_data.push_str(&format!("{} {:.1} {:.1}", cmd, x_scale(i), y_scale(bar.close)));
    }
    let stroke = if last.close >= first.open {
        "#16a34a"
    } else {
        "#dc2626"
    };

    let mut svg = open_svg(spec);
    svg.push_str(&axes());
    for (y, value) in [
        (MARGIN_TOP + 5.0, max_close),
        (MARGIN_TOP + plot_height / 2.0, (max_close + min_close) / 2.0),
        (CHART_HEIGHT - MARGIN_BOTTOM - 5.0, min_close),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            MARGIN_LEFT - 5.0,
            y,
            format_price(spec, value)
        ));
    }
    for (x, date) in [
        (MARGIN_LEFT, first.date),
        (MARGIN_LEFT + plot_width / 2.0, bars[bars.len() / 2].date),
        (CHART_WIDTH - MARGIN_RIGHT, last.date),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            x, CHART_HEIGHT, date
        ));
    }
    svg.push_str(&format!(
        "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>\n",
        path_data, stroke
    ));
    svg.push_str("</svg>");
    svg
}

fn open_svg(spec: &InstrumentSpec) -> String {
    let mut svg = format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    );
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"15\" text-anchor=\"end\" font-size=\"12\" fill=\"#666\">{} daily close</text>\n",
        CHART_WIDTH - MARGIN_RIGHT,
        spec.instrument
    ));
    svg
}

fn axes() -> String {
    format!(
        "  <line x1=\"{l}\" y1=\"{t}\" x2=\"{l}\" y2=\"{b}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n  \
         <line x1=\"{l}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = CHART_HEIGHT - MARGIN_BOTTOM,
        r = CHART_WIDTH - MARGIN_RIGHT,
    )
}

fn empty_chart(spec: &InstrumentSpec) -> String {
    let mut svg = open_svg(spec);
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"12\" fill=\"#666\">No history</text>\n",
        CHART_WIDTH / 2.0,
        CHART_HEIGHT / 2.0
    ));
    svg.push_str("</svg>");
    svg
}

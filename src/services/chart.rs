use std::path::Path;

use chrono::DateTime;
use plotters::prelude::*;

use crate::error::{BotError, Result};

use super::{analysis::sma, market::Candle};

const SIZE: (u32, u32) = (800, 400);

fn chart_err<E: std::fmt::Display>(e: E) -> BotError {
    BotError::Chart(e.to_string())
}

/// Renders closes with SMA50/SMA200 overlays to PNG bytes.
///
/// Blocking: callers on the runtime go through `spawn_blocking`. When text
/// cannot be drawn (no usable font on the host) the chart is redrawn with the
/// lines only.
pub fn render_png(symbol: &str, period_label: &str, candles: &[Candle]) -> Result<Vec<u8>> {
    if candles.len() < 2 {
        return Err(BotError::NoData(symbol.to_string()));
    }

    let file = tempfile::Builder::new()
        .prefix("angelbot-chart-")
        .suffix(".png")
        .tempfile()?;

    if let Err(e) = draw(file.path(), symbol, period_label, candles, true) {
        tracing::debug!(symbol, error = %e, "labelled chart failed, drawing lines only");
        draw(file.path(), symbol, period_label, candles, false)?;
    }

    Ok(std::fs::read(file.path())?)
}

fn draw(
    path: &Path,
    symbol: &str,
    period_label: &str,
    candles: &[Candle],
    labelled: bool,
) -> Result<()> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let sma50 = sma(&closes, 50);
    let sma200 = sma(&closes, 200);

    let (mut lo, mut hi) = closes
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(*c), hi.max(*c)));
    let pad = ((hi - lo) * 0.05).max(hi.abs() * 0.001).max(0.01);
    lo -= pad;
    hi += pad;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let date_of = |i: &usize| {
        candles
            .get(*i)
            .and_then(|c| DateTime::from_timestamp(c.ts, 0))
            .map(|d| d.format("%d/%m").to_string())
            .unwrap_or_default()
    };

    let mut builder = ChartBuilder::on(&root);
    builder.margin(12);
    if labelled {
        builder
            .caption(format!("{symbol} - {period_label}"), ("sans-serif", 22))
            .x_label_area_size(30)
            .y_label_area_size(60);
    }
    let mut chart = builder
        .build_cartesian_2d(0..candles.len(), lo..hi)
        .map_err(chart_err)?;

    if labelled {
        chart
            .configure_mesh()
            .x_labels(6)
            .x_label_formatter(&date_of)
            .y_desc("Prezzo")
            .draw()
            .map_err(chart_err)?;
    }

    chart
        .draw_series(LineSeries::new(
            closes.iter().enumerate().map(|(i, c)| (i, *c)),
            BLUE.stroke_width(2),
        ))
        .map_err(chart_err)?
        .label("Close")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    if closes.len() >= 5 {
        chart
            .draw_series(LineSeries::new(
                sma50.iter().enumerate().map(|(i, c)| (i, *c)),
                &RED,
            ))
            .map_err(chart_err)?
            .label("SMA50")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    }

    if closes.len() >= 50 {
        chart
            .draw_series(LineSeries::new(
                sma200.iter().enumerate().map(|(i, c)| (i, *c)),
                &GREEN,
            ))
            .map_err(chart_err)?
            .label("SMA200")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));
    }

    if labelled {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(chart_err)?;
    }

    root.present().map_err(chart_err)?;
    Ok(())
}

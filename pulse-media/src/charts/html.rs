//! Interactive candlestick page (Plotly from CDN).

use super::svg::escape;
use pulse_core::domain::PriceSeries;
use serde::Serialize;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Serialize)]
struct Candles<'a> {
    x: Vec<String>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

pub fn candlestick_page(series: &PriceSeries, width: u32, height: u32) -> Result<String, serde_json::Error> {
    let rows: Vec<_> = series.rows.iter().filter(|r| r.is_sane()).collect();
    let trace = Candles {
        x: rows.iter().map(|r| r.date.format("%Y-%m-%d").to_string()).collect(),
        open: rows.iter().map(|r| r.open).collect(),
        high: rows.iter().map(|r| r.high).collect(),
        low: rows.iter().map(|r| r.low).collect(),
        close: rows.iter().map(|r| r.close).collect(),
        name: &series.ticker,
        kind: "candlestick",
    };
    let layout = serde_json::json!({
        "title": format!("{} price", series.ticker),
        "xaxis": { "title": "time", "rangeslider": { "visible": false } },
        "yaxis": { "title": "price" },
        "width": width,
        "height": height,
        "template": "plotly_dark",
    });
    let data = serde_json::to_string(&[trace])?;
    let layout = serde_json::to_string(&layout)?;
    let title = escape(&series.ticker);

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title} price</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body style="margin:0;background:#111">
<div id="chart"></div>
<script>
Plotly.newPlot("chart", {data}, {layout});
</script>
</body>
</html>
"#
    ))
}

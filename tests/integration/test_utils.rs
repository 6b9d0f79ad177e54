//! Chart endpoint fixtures served from a mock quote API

#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 2024-01-01 09:15 IST
const FIRST_OPEN: i64 = 1_704_080_700;
const DAY: i64 = 86_400;
const IST_OFFSET: i64 = 19_800;

pub fn rising_closes(count: usize) -> Vec<f64> {
    (0..count).map(|i| 100.0 + i as f64).collect()
}

pub fn falling_closes(count: usize) -> Vec<f64> {
    (0..count).map(|i| 200.0 - i as f64).collect()
}

/// Chart payload with one row per close; `None` leaves the whole row null.
pub fn chart_body(symbol: &str, closes: &[Option<f64>]) -> Value {
    let timestamps: Vec<i64> = (0..closes.len() as i64)
        .map(|i| FIRST_OPEN + i * DAY)
        .collect();
    let column = |shift: f64| -> Vec<Option<f64>> {
        closes.iter().map(|c| c.map(|c| c + shift)).collect()
    };
    let volume: Vec<Option<f64>> = closes
        .iter()
        .enumerate()
        .map(|(i, c)| c.map(|_| 10_000.0 + i as f64))
        .collect();

    json!({
        "chart": {
            "result": [{
                "meta": {
                    "symbol": symbol,
                    "currency": "INR",
                    "gmtoffset": IST_OFFSET
                },
                "timestamp": timestamps,
                "indicators": {
                    "quote": [{
                        "open": column(0.0),
                        "high": column(1.0),
                        "low": column(-1.0),
                        "close": column(0.0),
                        "volume": volume
                    }]
                }
            }]
        },
        "error": null
    })
}

pub fn chart_path(symbol: &str) -> String {
    format!("/v8/finance/chart/{}", symbol)
}

pub async fn mount_closes(server: &MockServer, symbol: &str, closes: &[f64]) {
    mount_closes_delayed(server, symbol, closes, Duration::ZERO).await;
}

pub async fn mount_closes_delayed(
    server: &MockServer,
    symbol: &str,
    closes: &[f64],
    delay: Duration,
) {
    let rows: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    Mock::given(method("GET"))
        .and(path(chart_path(symbol)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chart_body(symbol, &rows))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

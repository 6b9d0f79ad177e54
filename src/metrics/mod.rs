//! Prometheus metrics for the HTTP surface and the refresh loop

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    /// Labelled by `outcome` (`success` / `failure`).
    pub refresh_cycles_total: IntCounterVec,
    pub refresh_duration_seconds: Histogram,
    pub refresh_triggers_dropped_total: IntCounter,
    pub symbol_errors_total: IntCounter,
    pub snapshot_symbols: IntGauge,
    pub database_connected: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total HTTP requests served")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently in flight")?;
        let refresh_cycles_total = IntCounterVec::new(
            Opts::new("refresh_cycles_total", "Completed refresh cycles by outcome"),
            &["outcome"],
        )?;
        let refresh_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "refresh_duration_seconds",
                "Wall time of one fetch and compute cycle",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;
        let refresh_triggers_dropped_total = IntCounter::new(
            "refresh_triggers_dropped_total",
            "Refresh triggers dropped because a cycle was already in flight",
        )?;
        let symbol_errors_total = IntCounter::new(
            "symbol_errors_total",
            "Per-symbol fetch or indicator failures",
        )?;
        let snapshot_symbols =
            IntGauge::new("snapshot_symbols", "Rows in the published snapshot")?;
        let database_connected = Gauge::new(
            "database_connected",
            "1 when the price database connection is up",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(refresh_cycles_total.clone()))?;
        registry.register(Box::new(refresh_duration_seconds.clone()))?;
        registry.register(Box::new(refresh_triggers_dropped_total.clone()))?;
        registry.register(Box::new(symbol_errors_total.clone()))?;
        registry.register(Box::new(snapshot_symbols.clone()))?;
        registry.register(Box::new(database_connected.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            refresh_cycles_total,
            refresh_duration_seconds,
            refresh_triggers_dropped_total,
            symbol_errors_total,
            snapshot_symbols,
            database_connected,
        })
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

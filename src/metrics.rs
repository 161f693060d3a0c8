//! Prometheus recorder setup plus the description of every series the
//! pipeline emits. Installed once at startup, before any ingest work, so
//! each counter carries its help text by the time the first scrape arrives.

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and publish the static playback
/// tick period gauge. The returned handle renders the exposition text for
/// the `/metrics` route.
pub fn install(tick_period_ms: u64) -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;

    describe_pipeline_metrics();
    gauge!("playback_tick_period_ms").set(tick_period_ms as f64);

    Ok(handle)
}

fn describe_pipeline_metrics() {
    describe_counter!("ingest_rows_total", "Total rows read from the source.");
    describe_counter!("ingest_kept_total", "Rows kept after normalization.");
    describe_counter!(
        "ingest_dropped_total",
        "Rows dropped for missing location/date."
    );
    describe_counter!("ingest_source_errors_total", "Source fetch/parse errors.");
    describe_counter!("frames_built_total", "Frames produced by the frame builder.");
    describe_counter!(
        "frames_bad_dates_total",
        "Rows dropped for unparseable dates."
    );
    describe_counter!(
        "frames_unplaced_rows_total",
        "Rows dropped for unresolvable coordinates."
    );
    describe_counter!("geocode_calls_total", "External geocoder calls issued.");
    describe_counter!(
        "geocode_cache_hits_total",
        "Geocode lookups served from cache, including coalesced waiters."
    );
    describe_counter!("geocode_misses_total", "Geocoder answered with no result.");
    describe_counter!("geocode_errors_total", "Geocoder transport/service errors.");
    describe_gauge!(
        "ingest_last_load_ts",
        "Unix ts when the dataset was last loaded."
    );
    describe_gauge!(
        "playback_tick_period_ms",
        "Auto-advance period in milliseconds."
    );
}

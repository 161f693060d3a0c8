//! Outbreak Globe — Binary Entrypoint
//! Loads the dataset, builds the frame sequence (including all geocode
//! resolutions), then boots the Axum server that feeds the globe renderer.
//! Nothing is served until the frame sequence is complete.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use outbreak_globe::api::{self, AppState};
use outbreak_globe::frames;
use outbreak_globe::geocode::{DisabledGeocoder, GeocodeCache, Geocoder, OpenCageGeocoder};
use outbreak_globe::ingest::{self, config as tables, csv_source::CsvSource};
use outbreak_globe::metrics;
use outbreak_globe::playback::{PlaybackController, TokioScheduler, FRAME_DURATION};
use outbreak_globe::resolver::LocationResolver;

const ENV_DATA_PATH: &str = "OUTBREAK_DATA_PATH";
const ENV_BIND_ADDR: &str = "OUTBREAK_ADDR";
const DEFAULT_DATA_PATH: &str = "data/owid-covid-data.csv";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("outbreak_globe=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op elsewhere. Supplies GEOCODER_API_KEY
    // and the OUTBREAK_* overrides.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = metrics::install(FRAME_DURATION.as_millis() as u64)?;

    // --- Static tables ---
    let aliases = tables::load_aliases_default().context("loading alias table")?;
    let centroids = tables::load_centroids_default().context("loading centroid table")?;
    tracing::info!(
        aliases = aliases.len(),
        centroids = centroids.len(),
        "static tables loaded"
    );

    // --- Dataset load (one-shot; gates everything downstream) ---
    let data_path =
        std::env::var(ENV_DATA_PATH).unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());
    let source = CsvSource::from_path(&data_path);
    let rows = ingest::load_dataset(&source, &aliases)
        .await
        .with_context(|| format!("loading dataset from {data_path}"))?;

    // --- Resolver: one cache for the whole session ---
    let geocoder: Arc<dyn Geocoder> = match OpenCageGeocoder::from_env()? {
        Some(g) => Arc::new(g),
        None => {
            tracing::warn!("GEOCODER_API_KEY not set; unmapped locations will be dropped");
            Arc::new(DisabledGeocoder)
        }
    };
    let cache = Arc::new(GeocodeCache::new());
    let resolver = LocationResolver::new(centroids, cache, geocoder);

    // --- Frames: fully built (all resolutions settled) before serving ---
    let frame_seq = frames::build_frames(&rows, &resolver).await;
    tracing::info!(frames = frame_seq.len(), rows = rows.len(), "frames built");

    let controller = Arc::new(PlaybackController::new(Arc::new(TokioScheduler)));
    controller.load(frame_seq.iter().map(|f| f.date).collect());

    let state = AppState::new(Arc::new(rows), Arc::new(frame_seq), controller);
    let app = api::create_router_with_metrics(state, metrics);

    let addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "serving");
    axum::serve(listener, app).await.context("server exited")?;

    Ok(())
}

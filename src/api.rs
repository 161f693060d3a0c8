//! HTTP surface for the external globe renderer: frame summaries, the
//! current renderable point set, playback transport, and dashboard series.
//! The renderer owns all visual mapping; this layer only hands it data.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregate::{CumulativeView, RenderMode, RenderPoint};
use crate::dashboard::{self, CountrySeries, CountryTotal};
use crate::frames::Frame;
use crate::ingest::types::NormalizedObservation;
use crate::playback::{PlaybackController, PlaybackSnapshot, TransportResult};

#[derive(Clone)]
pub struct AppState {
    rows: Arc<Vec<NormalizedObservation>>,
    frames: Arc<Vec<Frame>>,
    controller: Arc<PlaybackController>,
    // One running-total buffer per mode; grows append-only with playback.
    scatter_cum: Arc<Mutex<CumulativeView>>,
    hexbin_cum: Arc<Mutex<CumulativeView>>,
}

impl AppState {
    pub fn new(
        rows: Arc<Vec<NormalizedObservation>>,
        frames: Arc<Vec<Frame>>,
        controller: Arc<PlaybackController>,
    ) -> Self {
        Self {
            rows,
            frames,
            controller,
            scatter_cum: Arc::new(Mutex::new(CumulativeView::new(RenderMode::Scatter))),
            hexbin_cum: Arc::new(Mutex::new(CumulativeView::new(RenderMode::Hexbin))),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/frames", get(frames_summary))
        .route("/frame/points", get(frame_points))
        .route("/playback", get(playback_state))
        .route("/playback/step", post(playback_step))
        .route("/playback/seek", post(playback_seek))
        .route("/playback/toggle", post(playback_toggle))
        .route("/dashboard/series", get(dashboard_series))
        .route("/dashboard/top", get(dashboard_top))
        .route("/dashboard/locations", get(dashboard_locations))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// The same surface plus the Prometheus exposition endpoint.
pub fn create_router_with_metrics(state: AppState, metrics: PrometheusHandle) -> Router {
    create_router(state).route(
        "/metrics",
        get(move || {
            let handle = metrics.clone();
            async move { handle.render() }
        }),
    )
}

#[derive(Serialize)]
struct FramesSummary {
    frame_count: usize,
    dates: Vec<NaiveDate>,
}

async fn frames_summary(State(state): State<AppState>) -> Json<FramesSummary> {
    Json(FramesSummary {
        frame_count: state.frames.len(),
        dates: state.frames.iter().map(|f| f.date).collect(),
    })
}

#[derive(Deserialize)]
struct PointsQuery {
    #[serde(default = "default_mode")]
    mode: RenderMode,
    #[serde(default)]
    cumulative: bool,
}

fn default_mode() -> RenderMode {
    RenderMode::Hexbin
}

async fn frame_points(
    State(state): State<AppState>,
    Query(q): Query<PointsQuery>,
) -> Json<Vec<RenderPoint>> {
    let snap = state.controller.snapshot();
    if state.frames.is_empty() {
        return Json(Vec::new());
    }

    let points = if q.cumulative {
        let view = match q.mode {
            RenderMode::Scatter => &state.scatter_cum,
            RenderMode::Hexbin => &state.hexbin_cum,
        };
        let mut view = view.lock().expect("cumulative view mutex poisoned");
        view.points_through(&state.frames, snap.frame_index).to_vec()
    } else {
        crate::aggregate::materialize_frame(&state.frames[snap.frame_index], q.mode)
    };
    Json(points)
}

async fn playback_state(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    Json(state.controller.snapshot())
}

#[derive(Deserialize)]
struct StepQuery {
    dir: StepDir,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum StepDir {
    Fwd,
    Back,
}

#[derive(Serialize)]
struct StepResponse {
    result: TransportResult,
    #[serde(flatten)]
    snapshot: PlaybackSnapshot,
}

async fn playback_step(
    State(state): State<AppState>,
    Query(q): Query<StepQuery>,
) -> Json<StepResponse> {
    let result = match q.dir {
        StepDir::Fwd => state.controller.step_forward(),
        StepDir::Back => state.controller.step_back(),
    };
    Json(StepResponse {
        result,
        snapshot: state.controller.snapshot(),
    })
}

#[derive(Deserialize)]
struct SeekQuery {
    index: i64,
}

async fn playback_seek(
    State(state): State<AppState>,
    Query(q): Query<SeekQuery>,
) -> Json<PlaybackSnapshot> {
    Json(state.controller.seek(q.index))
}

async fn playback_toggle(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    Json(state.controller.toggle_play())
}

#[derive(Deserialize)]
struct SeriesQuery {
    location: String,
}

async fn dashboard_series(
    State(state): State<AppState>,
    Query(q): Query<SeriesQuery>,
) -> Json<CountrySeries> {
    Json(dashboard::country_series(&state.rows, &q.location))
}

#[derive(Deserialize)]
struct TopQuery {
    date: String,
    #[serde(default = "default_top_n")]
    n: usize,
}

fn default_top_n() -> usize {
    10
}

async fn dashboard_top(
    State(state): State<AppState>,
    Query(q): Query<TopQuery>,
) -> Json<Vec<CountryTotal>> {
    Json(dashboard::top_countries(&state.rows, &q.date, q.n))
}

async fn dashboard_locations(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(dashboard::distinct_locations(&state.rows))
}

// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod dashboard;
pub mod frames;
pub mod geocode;
pub mod ingest;
pub mod metrics;
pub mod playback;
pub mod resolver;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{CumulativeView, RenderMode, RenderPoint};
pub use crate::api::{create_router, AppState};
pub use crate::frames::{build_frames, Coordinate, Frame, GeoPoint};
pub use crate::geocode::{DisabledGeocoder, GeocodeCache, Geocoder, OpenCageGeocoder};
pub use crate::ingest::types::{NormalizedObservation, RawObservation};
pub use crate::playback::{
    PlaybackController, PlaybackPhase, PlaybackSnapshot, Scheduler, TickHandle, TokioScheduler,
    TransportResult,
};
pub use crate::resolver::LocationResolver;

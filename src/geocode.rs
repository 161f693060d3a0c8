//! # Geocoding
//! External coordinate lookup behind a provider trait, plus the session
//! cache that guarantees at most one external call per distinct location.
//!
//! The cache is an explicit object handed to the resolver at construction —
//! one instance per session, never reset mid-run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell};

use crate::frames::Coordinate;

const OPENCAGE_URL: &str = "https://api.opencagedata.com/geocode/v1/json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_GEOCODER_API_KEY: &str = "GEOCODER_API_KEY";

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `query`. `Ok(None)` means the service answered but found
    /// nothing; `Err` means transport/service failure. Callers treat both as
    /// unresolvable.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>>;
    fn name(&self) -> &'static str;
}

/// OpenCage forward geocoder.
pub struct OpenCageGeocoder {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    results: Vec<OpenCageResult>,
}
#[derive(Debug, Deserialize)]
struct OpenCageResult {
    geometry: Geometry,
}
#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

impl OpenCageGeocoder {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building geocoder http client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    /// Build from `$GEOCODER_API_KEY`. `None` when the key is absent/blank,
    /// so the caller can fall back to [`DisabledGeocoder`].
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(ENV_GEOCODER_API_KEY) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(key)?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Geocoder for OpenCageGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>> {
        let resp = self
            .client
            .get(OPENCAGE_URL)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("limit", "1"),
                ("no_annotations", "1"),
            ])
            .send()
            .await
            .context("geocoder request")?
            .error_for_status()
            .context("geocoder status")?;

        let body: OpenCageResponse = resp.json().await.context("geocoder response body")?;
        let coord = body
            .results
            .into_iter()
            .next()
            .map(|r| Coordinate::new(r.geometry.lat, r.geometry.lng))
            .filter(Coordinate::is_valid);
        Ok(coord)
    }

    fn name(&self) -> &'static str {
        "OpenCage"
    }
}

/// No-network stand-in used when no API key is configured. Every lookup is
/// "not found", which the cache then remembers, so locations without a
/// centroid simply stay off the globe.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _query: &str) -> Result<Option<Coordinate>> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Session-lifetime memo of geocode outcomes, success and failure alike.
/// Entries are never evicted.
///
/// Each location gets one `OnceCell`; concurrent requests for the same
/// location share the single in-flight call while different locations
/// proceed independently.
pub struct GeocodeCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Option<Coordinate>>>>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `location` through `geocoder`, consulting the cache first.
    /// A transport error is recorded as a permanent "unresolved" outcome for
    /// the rest of the session — no retry storms.
    pub async fn resolve(
        &self,
        location: &str,
        geocoder: &dyn Geocoder,
    ) -> Option<Coordinate> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(location.to_string()).or_default())
        };

        // Exactly one caller runs the init future and pays for the external
        // call; everyone else, whether the cell was already populated or they
        // coalesced onto an in-flight call, is a cache hit.
        let mut fetched = false;
        let outcome = *cell
            .get_or_init(|| {
                fetched = true;
                counter!("geocode_calls_total").increment(1);
                async move {
                    match geocoder.geocode(location).await {
                        Ok(found) => {
                            if found.is_none() {
                                tracing::warn!(location, "no coordinates found");
                                counter!("geocode_misses_total").increment(1);
                            }
                            found
                        }
                        Err(e) => {
                            tracing::warn!(error = ?e, location, provider = geocoder.name(), "geocoder error");
                            counter!("geocode_errors_total").increment(1);
                            None
                        }
                    }
                }
            })
            .await;
        if !fetched {
            counter!("geocode_cache_hits_total").increment(1);
        }
        outcome
    }

    /// Cached outcome for `location`, if any. `None` = never requested;
    /// `Some(None)` = requested and unresolved.
    pub async fn peek(&self, location: &str) -> Option<Option<Coordinate>> {
        let entries = self.entries.lock().await;
        entries.get(location).and_then(|cell| cell.get().copied())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new()
    }
}

//! # Location Resolver
//! Maps an observation to coordinates: inline lat/lng when the row carries
//! them, else the static centroid table, else one (cached) external geocode.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;

use crate::frames::Coordinate;
use crate::geocode::{Geocoder, GeocodeCache};
use crate::ingest::types::NormalizedObservation;

pub struct LocationResolver {
    centroids: HashMap<String, Coordinate>,
    cache: Arc<GeocodeCache>,
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(
        centroids: HashMap<String, Coordinate>,
        cache: Arc<GeocodeCache>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            centroids,
            cache,
            geocoder,
        }
    }

    /// Resolve a full row: explicit row coordinates win and skip lookup
    /// entirely; otherwise fall back to [`resolve_name`](Self::resolve_name).
    pub async fn resolve_row(&self, row: &NormalizedObservation) -> Option<Coordinate> {
        if let (Some(lat), Some(lng)) = (row.latitude, row.longitude) {
            let inline = Coordinate::new(lat, lng);
            if inline.is_valid() {
                counter!("resolve_inline_total").increment(1);
                return Some(inline);
            }
        }
        self.resolve_name(&row.location).await
    }

    /// Resolve a canonical location name: centroid table first, then the
    /// external geocoder (at most one call per distinct name per session).
    pub async fn resolve_name(&self, location: &str) -> Option<Coordinate> {
        if let Some(c) = self.centroids.get(location) {
            counter!("resolve_centroid_total").increment(1);
            return Some(*c);
        }
        self.cache.resolve(location, self.geocoder.as_ref()).await
    }

    /// The session cache this resolver shares with any other holder.
    pub fn cache(&self) -> &Arc<GeocodeCache> {
        &self.cache
    }

    pub fn centroid_count(&self) -> usize {
        self.centroids.len()
    }
}

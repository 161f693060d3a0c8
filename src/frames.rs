//! # Frame Builder
//! Groups normalized observations by calendar date into the ordered frame
//! sequence the playback controller walks. Coordinates come from the
//! location resolver; rows it cannot place are skipped, never errored.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::ingest::types::NormalizedObservation;
use crate::resolver::LocationResolver;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One geospatially resolved, magnitude-weighted observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub coordinate: Coordinate,
    /// New-case count driving visual size/height.
    pub magnitude: f64,
    /// Canonical location the point came from (diagnostics, jitter seeding).
    pub source_location: String,
}

/// All observations for one calendar date, in arrival order.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub date: NaiveDate,
    pub points: Vec<GeoPoint>,
}

/// Group rows by date and resolve each into a [`GeoPoint`].
///
/// * Rows with an unparseable date are dropped (counted, not errored).
/// * A parseable date always opens its frame, even if every row for it is
///   later skipped — a date with zero usable points is still a frame.
/// * Rows with magnitude <= 0 or an unresolvable location contribute nothing.
/// * The returned sequence is strictly ascending by calendar date; the
///   `BTreeMap` grouping makes ties impossible.
///
/// The resolver may reach out to the external geocoder, so the full sequence
/// is only handed onward once every resolution has settled.
pub async fn build_frames(
    rows: &[NormalizedObservation],
    resolver: &LocationResolver,
) -> Vec<Frame> {
    let mut groups: BTreeMap<NaiveDate, Vec<GeoPoint>> = BTreeMap::new();

    for row in rows {
        let date = match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                counter!("frames_bad_dates_total").increment(1);
                continue;
            }
        };

        // Open the frame before magnitude/coordinate checks.
        let group = groups.entry(date).or_default();

        let magnitude = row.new_cases.unwrap_or(0.0);
        if magnitude <= 0.0 {
            continue;
        }

        let Some(coordinate) = resolver.resolve_row(row).await else {
            counter!("frames_unplaced_rows_total").increment(1);
            continue;
        };

        group.push(GeoPoint {
            coordinate,
            magnitude,
            source_location: row.location.clone(),
        });
    }

    let frames: Vec<Frame> = groups
        .into_iter()
        .map(|(date, points)| Frame { date, points })
        .collect();

    counter!("frames_built_total").increment(frames.len() as u64);
    frames
}

//! # Point Aggregator
//! Turns a frame's magnitude-weighted points into the renderable set the
//! globe consumes: a jittered point cloud (scatter) or weighted bins ready
//! for hex aggregation. Also owns the cumulative "cases so far" view.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::frames::Frame;

/// 1 unit = N cases (lower = more detail, higher = less detail).
pub const CASES_PER_UNIT: f64 = 50.0;
/// A magnitude > 0 always draws at least this many sub-points.
pub const MIN_SCATTER_POINTS: usize = 1;
/// Scatter sub-point cap per location; keeps one huge outlier from flooding
/// the renderer.
pub const MAX_SCATTER_POINTS: usize = 2_000;
/// Angular jitter radius in degrees for scatter sub-points.
pub const JITTER_RADIUS_DEG: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Scatter,
    Hexbin,
}

/// What crosses the renderer boundary: position plus size (scatter) or
/// bin weight (hexbin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderPoint {
    pub lat: f64,
    pub lng: f64,
    pub weight: f64,
}

/// Sub-linear altitude for a hex cell: `ln(sum_weight + 1) * 0.05`.
/// Monotonic in summed weight, so outlier magnitudes do not dominate the
/// visual scale.
pub fn hex_altitude(sum_weight: f64) -> f64 {
    (sum_weight.max(0.0) + 1.0).ln() * 0.05
}

/// Deterministic sub-point count for a scatter magnitude: never zero for a
/// positive magnitude, monotonic, capped.
pub fn scatter_count(magnitude: f64) -> usize {
    let n = (magnitude / CASES_PER_UNIT).floor() as usize;
    n.max(MIN_SCATTER_POINTS).min(MAX_SCATTER_POINTS)
}

/// Materialize one frame's renderable set. Pure; the frame is not touched.
pub fn materialize_frame(frame: &Frame, mode: RenderMode) -> Vec<RenderPoint> {
    match mode {
        RenderMode::Hexbin => frame
            .points
            .iter()
            .map(|p| RenderPoint {
                lat: p.coordinate.lat,
                lng: p.coordinate.lng,
                weight: p.magnitude / CASES_PER_UNIT,
            })
            .collect(),
        RenderMode::Scatter => {
            let mut out = Vec::new();
            for p in &frame.points {
                let n = scatter_count(p.magnitude);
                let mut rng = jitter_rng(frame, &p.source_location);
                for _ in 0..n {
                    let (dlat, dlng) = jitter_offset(&mut rng);
                    out.push(RenderPoint {
                        lat: (p.coordinate.lat + dlat).clamp(-90.0, 90.0),
                        lng: wrap_lng(p.coordinate.lng + dlng),
                        weight: 1.0,
                    });
                }
            }
            out
        }
    }
}

// Seeded from (date, location) so re-materializing a frame yields the same
// cloud every time.
fn jitter_rng(frame: &Frame, location: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    frame.date.hash(&mut hasher);
    location.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

// Uniform over a disc of JITTER_RADIUS_DEG.
fn jitter_offset(rng: &mut StdRng) -> (f64, f64) {
    let r = JITTER_RADIUS_DEG * rng.random_range(0.0f64..1.0).sqrt();
    let theta = rng.random_range(0.0f64..std::f64::consts::TAU);
    (r * theta.cos(), r * theta.sin())
}

fn wrap_lng(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}

/// Running-total view over the frame sequence: the set for frame `k` is the
/// union of all points from frames `0..=k` ("cases observed so far").
///
/// Append-only: advancing materializes only the frames not yet buffered, so
/// a full playback costs one materialization per frame, not one per
/// (frame, step) pair. Seeking backwards is a slice into the same buffer.
pub struct CumulativeView {
    mode: RenderMode,
    buffer: Vec<RenderPoint>,
    /// ends[k] = buffer length after folding in frame k.
    ends: Vec<usize>,
}

impl CumulativeView {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            buffer: Vec::new(),
            ends: Vec::new(),
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// All points from frames `0..=index`. `frames` must be the same
    /// sequence on every call; the view never recomputes what it has
    /// already buffered.
    pub fn points_through(&mut self, frames: &[Frame], index: usize) -> &[RenderPoint] {
        if frames.is_empty() {
            return &[];
        }
        let index = index.min(frames.len() - 1);
        while self.ends.len() <= index {
            let next = &frames[self.ends.len()];
            self.buffer.extend(materialize_frame(next, self.mode));
            self.ends.push(self.buffer.len());
        }
        &self.buffer[..self.ends[index]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{Coordinate, GeoPoint};
    use chrono::NaiveDate;

    fn frame(date: &str, magnitudes: &[f64]) -> Frame {
        Frame {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            points: magnitudes
                .iter()
                .map(|&m| GeoPoint {
                    coordinate: Coordinate::new(20.59, 78.96),
                    magnitude: m,
                    source_location: "India".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn scatter_count_is_monotonic_and_never_zero() {
        assert_eq!(scatter_count(1.0), MIN_SCATTER_POINTS);
        assert_eq!(scatter_count(49.0), 1);
        assert_eq!(scatter_count(100.0), 2);
        assert_eq!(scatter_count(1e9), MAX_SCATTER_POINTS);
        let mut prev = 0;
        for m in [1.0, 50.0, 99.0, 100.0, 5_000.0, 1e9] {
            let n = scatter_count(m);
            assert!(n >= prev);
            prev = n;
        }
    }

    #[test]
    fn scatter_jitter_stays_within_radius_and_is_deterministic() {
        let f = frame("2020-03-01", &[500.0]);
        let a = materialize_frame(&f, RenderMode::Scatter);
        let b = materialize_frame(&f, RenderMode::Scatter);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        for p in &a {
            let dlat = p.lat - 20.59;
            let dlng = p.lng - 78.96;
            assert!((dlat * dlat + dlng * dlng).sqrt() <= JITTER_RADIUS_DEG + 1e-9);
        }
    }

    #[test]
    fn hexbin_emits_one_weighted_point_per_geopoint() {
        let f = frame("2020-03-01", &[100.0, 25.0]);
        let out = materialize_frame(&f, RenderMode::Hexbin);
        assert_eq!(out.len(), 2);
        assert!((out[0].weight - 2.0).abs() < 1e-12);
        assert!((out[1].weight - 0.5).abs() < 1e-12);
    }

    #[test]
    fn hex_altitude_is_monotonic_and_sublinear() {
        assert_eq!(hex_altitude(0.0), 0.0);
        assert!(hex_altitude(10.0) > hex_altitude(1.0));
        // Sub-linear: doubling the weight less than doubles the altitude.
        assert!(hex_altitude(20.0) < 2.0 * hex_altitude(10.0));
    }

    #[test]
    fn cumulative_sets_are_strict_supersets() {
        let frames = vec![
            frame("2020-03-01", &[100.0]),
            frame("2020-03-02", &[50.0]),
            frame("2020-03-03", &[75.0]),
        ];
        let mut view = CumulativeView::new(RenderMode::Hexbin);
        let mut prev_len = 0;
        for k in 0..frames.len() {
            let pts = view.points_through(&frames, k);
            assert!(pts.len() > prev_len, "frame {k} must add points");
            prev_len = pts.len();
        }
        // Prefix property: frame k's set starts with frame k-1's set.
        let through_1 = view.points_through(&frames, 1).to_vec();
        let through_2 = view.points_through(&frames, 2).to_vec();
        assert_eq!(&through_2[..through_1.len()], &through_1[..]);
    }

    #[test]
    fn cumulative_seek_back_does_not_recompute() {
        let frames = vec![frame("2020-03-01", &[100.0]), frame("2020-03-02", &[50.0])];
        let mut view = CumulativeView::new(RenderMode::Hexbin);
        let full = view.points_through(&frames, 1).len();
        let back = view.points_through(&frames, 0).len();
        assert!(back < full);
        assert_eq!(view.points_through(&frames, 1).len(), full);
    }
}

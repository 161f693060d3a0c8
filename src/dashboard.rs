//! # Dashboard Series
//! Chart-facing re-filters over the same normalized rows the globe uses:
//! per-country cumulative trends and a fixed-date top-N snapshot. Pure
//! functions; the chart renderer itself lives outside this crate.

use serde::Serialize;

use crate::ingest::types::NormalizedObservation;

/// Trend series for one country, aligned by index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySeries {
    pub location: String,
    pub dates: Vec<String>,
    pub total_cases: Vec<f64>,
    pub total_deaths: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryTotal {
    pub location: String,
    pub total_cases: f64,
}

/// Total-cases and total-deaths trends for `location`, in row order.
/// Blank totals chart as 0, matching the upstream dataset's convention.
pub fn country_series(rows: &[NormalizedObservation], location: &str) -> CountrySeries {
    let mut dates = Vec::new();
    let mut total_cases = Vec::new();
    let mut total_deaths = Vec::new();

    for row in rows.iter().filter(|r| r.location == location) {
        dates.push(row.date.clone());
        total_cases.push(row.total_cases.unwrap_or(0.0));
        total_deaths.push(row.total_deaths.unwrap_or(0.0));
    }

    CountrySeries {
        location: location.to_string(),
        dates,
        total_cases,
        total_deaths,
    }
}

/// Top `n` countries by total cases on `date`. Rows without a total are
/// excluded from the ranking.
pub fn top_countries(rows: &[NormalizedObservation], date: &str, n: usize) -> Vec<CountryTotal> {
    let mut snapshot: Vec<CountryTotal> = rows
        .iter()
        .filter(|r| r.date == date)
        .filter_map(|r| {
            r.total_cases.map(|t| CountryTotal {
                location: r.location.clone(),
                total_cases: t,
            })
        })
        .collect();

    snapshot.sort_by(|a, b| {
        b.total_cases
            .partial_cmp(&a.total_cases)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    snapshot.truncate(n);
    snapshot
}

/// Distinct locations present in the dataset, sorted (selector options).
pub fn distinct_locations(rows: &[NormalizedObservation]) -> Vec<String> {
    let mut out: Vec<String> = rows.iter().map(|r| r.location.clone()).collect();
    out.sort();
    out.dedup();
    out
}

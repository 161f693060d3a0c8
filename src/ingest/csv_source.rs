// src/ingest/csv_source.rs
//
// Tabular source boundary: header-based CSV, one typed seam. Rows are
// deserialized into `RawObservation`; rows the codec cannot shape are
// skipped with a warning rather than failing the load.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::path::PathBuf;

use crate::ingest::types::{ObservationSource, RawObservation};

pub struct CsvSource {
    mode: Mode,
}

enum Mode {
    Path(PathBuf),
    // Owned copy so tests can hand in any &str.
    Fixture(String),
}

impl CsvSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::Path(path.into()),
        }
    }

    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_rows_from_str(s: &str) -> Result<Vec<RawObservation>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(s.as_bytes());

        let mut out = Vec::new();
        for result in reader.deserialize::<RawObservation>() {
            match result {
                Ok(row) => out.push(row),
                Err(e) => {
                    tracing::warn!(error = ?e, "skipping malformed csv row");
                    counter!("ingest_source_errors_total").increment(1);
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ObservationSource for CsvSource {
    async fn fetch_rows(&self) -> Result<Vec<RawObservation>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_rows_from_str(s),
            Mode::Path(path) => {
                let body = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading dataset from {}", path.display()))?;
                Self::parse_rows_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_numerics_become_none() {
        let csv = "location,date,new_cases,total_cases,total_deaths\n\
                   India,2020-03-01,100,150,2\n\
                   India,2020-03-02,,,\n";
        let rows = CsvSource::parse_rows_from_str(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].new_cases, Some(100.0));
        assert_eq!(rows[1].new_cases, None);
        // No latitude/longitude columns at all is fine too.
        assert_eq!(rows[0].latitude, None);
    }

    #[test]
    fn optional_coordinate_columns_are_read() {
        let csv = "location,date,new_cases,total_cases,total_deaths,latitude,longitude\n\
                   Atlantis,2020-03-01,5,5,0,12.5,-45.0\n";
        let rows = CsvSource::parse_rows_from_str(csv).unwrap();
        assert_eq!(rows[0].latitude, Some(12.5));
        assert_eq!(rows[0].longitude, Some(-45.0));
    }
}

// src/ingest/types.rs
use anyhow::Result;

/// One row as read from the tabular source. Numeric fields may be blank
/// upstream; blanks deserialize to `None`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawObservation {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date: String, // ISO date as reported, e.g. "2020-03-01"
    #[serde(default)]
    pub new_cases: Option<f64>,
    #[serde(default)]
    pub total_cases: Option<f64>,
    #[serde(default)]
    pub total_deaths: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A row that survived normalization: `location` is canonical and non-empty,
/// `date` is non-empty.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedObservation {
    pub location: String,
    pub date: String,
    pub new_cases: Option<f64>,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[async_trait::async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<RawObservation>>;
    fn name(&self) -> &'static str;
}

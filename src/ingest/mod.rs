// src/ingest/mod.rs
pub mod config;
pub mod csv_source;
pub mod types;

use crate::ingest::config::AliasTable;
use crate::ingest::types::{NormalizedObservation, ObservationSource, RawObservation};
use metrics::{counter, gauge};
use once_cell::sync::OnceCell;

/// Canonical form of a source-reported location: trimmed, interior whitespace
/// collapsed, then rewritten through the alias table. `None` when nothing
/// usable remains.
pub fn canonical_location(raw: &str, aliases: &AliasTable) -> Option<String> {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());

    let collapsed = re_ws.replace_all(raw.trim(), " ").to_string();
    if collapsed.is_empty() {
        return None;
    }
    Some(
        aliases
            .get(&collapsed)
            .cloned()
            .unwrap_or(collapsed),
    )
}

/// Canonicalize rows. Rows missing a usable `location` or `date` are
/// silently filtered (counted, never errored); everything else passes
/// through with `location` rewritten via the alias table.
///
/// Pure over its input and idempotent: canonical names have no alias entry,
/// so a second pass is a no-op.
pub fn normalize(rows: Vec<RawObservation>, aliases: &AliasTable) -> Vec<NormalizedObservation> {
    let mut dropped = 0usize;
    let mut kept = Vec::with_capacity(rows.len());

    for row in rows {
        let date = row.date.trim();
        let location = canonical_location(&row.location, aliases);
        let (Some(location), false) = (location, date.is_empty()) else {
            dropped += 1;
            continue;
        };

        kept.push(NormalizedObservation {
            location,
            date: date.to_string(),
            new_cases: row.new_cases,
            total_cases: row.total_cases,
            total_deaths: row.total_deaths,
            latitude: row.latitude,
            longitude: row.longitude,
        });
    }

    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_dropped_total").increment(dropped as u64);
    kept
}

/// Fetch rows from the source and normalize them in one pass. Only a total
/// failure to obtain the dataset surfaces as an error; per-row problems are
/// absorbed by the filter.
pub async fn load_dataset(
    source: &dyn ObservationSource,
    aliases: &AliasTable,
) -> anyhow::Result<Vec<NormalizedObservation>> {
    let raw = match source.fetch_rows().await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = ?e, source = source.name(), "dataset load failed");
            counter!("ingest_source_errors_total").increment(1);
            return Err(e);
        }
    };
    counter!("ingest_rows_total").increment(raw.len() as u64);

    let rows = normalize(raw, aliases);

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    gauge!("ingest_last_load_ts").set(now as f64);
    tracing::info!(
        source = source.name(),
        kept = rows.len(),
        "dataset loaded"
    );
    Ok(rows)
}

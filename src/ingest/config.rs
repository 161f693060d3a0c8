// src/ingest/config.rs
//
// Static configuration for the pipeline: the alias table (source-reported
// name -> canonical name) and the centroid table (canonical name -> lat/lng).
// Both support TOML or JSON, loaded env-var first with path fallbacks, and
// fall back to built-in defaults when no file is present.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::frames::Coordinate;

pub const ENV_ALIASES_PATH: &str = "OUTBREAK_ALIASES_PATH";
pub const ENV_CENTROIDS_PATH: &str = "OUTBREAK_CENTROIDS_PATH";

pub type AliasTable = HashMap<String, String>;
pub type CentroidTable = HashMap<String, Coordinate>;

/// Load the alias table from an explicit path. Supports TOML or JSON.
pub fn load_aliases_from(path: &Path) -> Result<AliasTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading aliases from {}", path.display()))?;
    parse_aliases(&content, ext_of(path).as_str())
}

/// Load the alias table using env var + fallbacks:
/// 1) $OUTBREAK_ALIASES_PATH
/// 2) config/aliases.toml
/// 3) config/aliases.json
/// 4) built-in defaults
pub fn load_aliases_default() -> Result<AliasTable> {
    if let Ok(p) = std::env::var(ENV_ALIASES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_aliases_from(&pb);
        } else {
            return Err(anyhow!("OUTBREAK_ALIASES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/aliases.toml");
    if toml_p.exists() {
        return load_aliases_from(&toml_p);
    }
    let json_p = PathBuf::from("config/aliases.json");
    if json_p.exists() {
        return load_aliases_from(&json_p);
    }
    Ok(builtin_aliases())
}

/// Load the centroid table from an explicit path. Supports TOML or JSON.
pub fn load_centroids_from(path: &Path) -> Result<CentroidTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading centroids from {}", path.display()))?;
    parse_centroids(&content, ext_of(path).as_str())
}

/// Load the centroid table using env var + fallbacks, same order as aliases.
pub fn load_centroids_default() -> Result<CentroidTable> {
    if let Ok(p) = std::env::var(ENV_CENTROIDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_centroids_from(&pb);
        } else {
            return Err(anyhow!(
                "OUTBREAK_CENTROIDS_PATH points to non-existent path"
            ));
        }
    }
    let toml_p = PathBuf::from("config/centroids.toml");
    if toml_p.exists() {
        return load_centroids_from(&toml_p);
    }
    let json_p = PathBuf::from("config/centroids.json");
    if json_p.exists() {
        return load_centroids_from(&json_p);
    }
    Ok(builtin_centroids())
}

/// The name variants the upstream dataset reports differently from the
/// centroid table. Mirrors the mapping the dashboard views apply, so every
/// consumer joins on the same canonical names.
pub fn builtin_aliases() -> AliasTable {
    [
        ("United States", "United States of America"),
        ("South Korea", "Korea, Republic of"),
        ("North Korea", "Korea, Democratic People's Republic of"),
        (
            "Democratic Republic of Congo",
            "Congo, The Democratic Republic of the",
        ),
        ("Republic of Congo", "Congo"),
        ("Czechia", "Czech Republic"),
        ("Myanmar", "Burma"),
        ("Eswatini", "Swaziland"),
        ("Cabo Verde", "Cape Verde"),
        (
            "North Macedonia",
            "Macedonia, The Former Yugoslav Republic of",
        ),
        ("Syria", "Syrian Arab Republic"),
        ("Taiwan", "Taiwan, Province of China"),
        ("Laos", "Lao People's Democratic Republic"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Minimal built-in centroid set for running without a config directory.
/// The shipped `config/centroids.toml` is the real table; anything missing
/// from either falls through to the geocoder.
pub fn builtin_centroids() -> CentroidTable {
    [
        ("India", 20.59, 78.96),
        ("China", 35.86, 104.20),
        ("United States of America", 39.78, -100.44),
        ("Brazil", -14.24, -51.93),
        ("Russia", 61.52, 105.32),
        ("United Kingdom", 55.38, -3.44),
        ("France", 46.23, 2.21),
        ("Germany", 51.17, 10.45),
        ("Italy", 41.87, 12.57),
        ("Spain", 40.46, -3.75),
        ("Japan", 36.20, 138.25),
        ("Korea, Republic of", 35.91, 127.77),
        ("South Africa", -30.56, 22.94),
        ("Australia", -25.27, 133.78),
    ]
    .into_iter()
    .map(|(k, lat, lng)| (k.to_string(), Coordinate::new(lat, lng)))
    .collect()
}

fn ext_of(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn parse_aliases(s: &str, hint_ext: &str) -> Result<AliasTable> {
    #[derive(serde::Deserialize)]
    struct TomlAliases {
        aliases: HashMap<String, String>,
    }
    if hint_ext == "toml" || s.contains("[aliases]") {
        if let Ok(v) = toml::from_str::<TomlAliases>(s) {
            return Ok(clean_map(v.aliases));
        }
    }
    if let Ok(v) = serde_json::from_str::<HashMap<String, String>>(s) {
        return Ok(clean_map(v));
    }
    Err(anyhow!("unsupported alias table format"))
}

fn parse_centroids(s: &str, hint_ext: &str) -> Result<CentroidTable> {
    #[derive(serde::Deserialize)]
    struct TomlCentroids {
        centroids: HashMap<String, Coordinate>,
    }
    if hint_ext == "toml" || s.contains("[centroids]") {
        if let Ok(v) = toml::from_str::<TomlCentroids>(s) {
            return validate_centroids(v.centroids);
        }
    }
    if let Ok(v) = serde_json::from_str::<HashMap<String, Coordinate>>(s) {
        return validate_centroids(v);
    }
    Err(anyhow!("unsupported centroid table format"))
}

fn clean_map(map: HashMap<String, String>) -> AliasTable {
    map.into_iter()
        .filter_map(|(k, v)| {
            let (k, v) = (k.trim().to_string(), v.trim().to_string());
            (!k.is_empty() && !v.is_empty()).then_some((k, v))
        })
        .collect()
}

fn validate_centroids(map: HashMap<String, Coordinate>) -> Result<CentroidTable> {
    for (name, c) in &map {
        if !c.is_valid() {
            return Err(anyhow!(
                "centroid for '{}' out of range: lat={}, lng={}",
                name,
                c.lat,
                c.lng
            ));
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn alias_formats_parse_and_trim() {
        let toml = "[aliases]\n\" United States \" = \"United States of America\"\n\"X\" = \"\"\n";
        let out = parse_aliases(toml, "toml").unwrap();
        assert_eq!(
            out.get("United States").map(String::as_str),
            Some("United States of America")
        );
        assert!(!out.contains_key("X"));

        let json = r#"{"Czechia": "Czech Republic"}"#;
        let out = parse_aliases(json, "json").unwrap();
        assert_eq!(
            out.get("Czechia").map(String::as_str),
            Some("Czech Republic")
        );
    }

    #[test]
    fn centroid_out_of_range_is_rejected() {
        let json = r#"{"Nowhere": {"lat": 123.0, "lng": 0.0}}"#;
        assert!(parse_centroids(json, "json").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD into a temp dir so the repo's config/ does not interfere.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_ALIASES_PATH);

        // No files in temp CWD -> built-in defaults.
        let v = load_aliases_default().unwrap();
        assert_eq!(
            v.get("Myanmar").map(String::as_str),
            builtin_aliases().get("Myanmar").map(String::as_str)
        );

        // Env wins.
        let p_json = tmp.path().join("aliases.json");
        fs::write(&p_json, r#"{"A": "B"}"#).unwrap();
        env::set_var(ENV_ALIASES_PATH, p_json.display().to_string());
        let v2 = load_aliases_default().unwrap();
        assert_eq!(v2.get("A").map(String::as_str), Some("B"));
        assert_eq!(v2.len(), 1);
        env::remove_var(ENV_ALIASES_PATH);

        env::set_current_dir(&old).unwrap();
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Economic indicators for a single region.
///
/// Fields are optional because the regional data file may carry partial
/// records; the scoring function supplies its own defaults for missing
/// fields (see [`crate::scoring`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    #[serde(default)]
    pub unemployment_rate: Option<f64>,
    #[serde(default)]
    pub avg_income: Option<f64>,
}

impl RegionStats {
    pub fn new(unemployment_rate: f64, avg_income: f64) -> Self {
        Self {
            unemployment_rate: Some(unemployment_rate),
            avg_income: Some(avg_income),
        }
    }

    /// Substitute stats for a region the data set does not cover.
    ///
    /// Distinct from [`RegionalData::builtin`], which replaces the whole
    /// table when the source file cannot be loaded. Both fallbacks are
    /// intentional and keep their own literal values.
    pub fn lookup_default() -> Self {
        Self::new(0.15, 175.0)
    }
}

/// Read-only mapping from region name to economic stats, loaded once per
/// consumer (the request layer loads at startup, the refresh job reloads
/// each cycle).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalData {
    regions: HashMap<String, RegionStats>,
}

impl RegionalData {
    /// Parse the JSON source file.
    pub fn load(path: &Path) -> Result<Self, RegionalDataError> {
        let raw = fs::read_to_string(path).map_err(|source| RegionalDataError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let regions: HashMap<String, RegionStats> =
            serde_json::from_str(&raw).map_err(|source| RegionalDataError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { regions })
    }

    /// Load the source file, falling back to the built-in table when it is
    /// missing or corrupt. Loading failure must never abort the process.
    pub fn load_or_builtin(path: &Path) -> Self {
        match Self::load(path) {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, "regional data unavailable, using built-in table");
                Self::builtin()
            }
        }
    }

    /// Hard-coded three-region table used when the source cannot be loaded.
    pub fn builtin() -> Self {
        let mut regions = HashMap::new();
        regions.insert("Montserrado".to_string(), RegionStats::new(0.12, 200.0));
        regions.insert("Bong".to_string(), RegionStats::new(0.18, 150.0));
        regions.insert("Nimba".to_string(), RegionStats::new(0.15, 180.0));
        Self { regions }
    }

    pub fn lookup(&self, region: &str) -> Option<&RegionStats> {
        self.regions.get(region)
    }

    /// Stats for a region, substituting the lookup-miss default when the
    /// region is not in the table.
    pub fn stats_or_default(&self, region: &str) -> RegionStats {
        self.lookup(region)
            .cloned()
            .unwrap_or_else(RegionStats::lookup_default)
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegionalDataError {
    #[error("failed to read regional data from '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse regional data from '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_miss_substitutes_fixed_default() {
        let data = RegionalData::builtin();
        assert!(data.lookup("Atlantis").is_none());
        let stats = data.stats_or_default("Atlantis");
        assert_eq!(stats, RegionStats::new(0.15, 175.0));
    }

    #[test]
    fn load_failure_falls_back_to_builtin_table() {
        let data = RegionalData::load_or_builtin(Path::new("no/such/file.json"));
        assert_eq!(data, RegionalData::builtin());
        let montserrado = data.lookup("Montserrado").expect("builtin region");
        assert_eq!(montserrado, &RegionStats::new(0.12, 200.0));
    }

    #[test]
    fn both_fallbacks_stay_distinct() {
        let builtin = RegionalData::builtin();
        let nimba = builtin.stats_or_default("Nimba");
        assert_eq!(nimba, RegionStats::new(0.15, 180.0));
        assert_ne!(nimba, RegionStats::lookup_default());
    }

    #[test]
    fn parses_partial_records() {
        let raw = r#"{ "Lofa": { "unemployment_rate": 0.2 } }"#;
        let regions: HashMap<String, RegionStats> =
            serde_json::from_str(raw).expect("partial record parses");
        let lofa = &regions["Lofa"];
        assert_eq!(lofa.unemployment_rate, Some(0.2));
        assert_eq!(lofa.avg_income, None);
    }
}

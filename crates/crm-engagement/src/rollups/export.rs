use super::{parse_timestamp, RefreshSummary, RollupSource, RollupSourceError};
use crate::engagement::{ActivityRollup, PrincipalId, PrincipalRollup};
use chrono::Utc;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ExportRow {
    principal_id: String,
    #[serde(default)]
    principal_name: String,
    #[serde(default)]
    total_interactions: Option<i64>,
    #[serde(default)]
    total_opportunities: Option<i64>,
    #[serde(default)]
    product_count: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_activity_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_principal: Option<String>,
}

impl ExportRow {
    fn is_principal(&self) -> bool {
        !matches!(
            self.is_principal
                .as_deref()
                .map(|flag| flag.trim().to_ascii_lowercase())
                .as_deref(),
            Some("false" | "f" | "0" | "no" | "n")
        )
    }

    fn into_rollup(self) -> Result<PrincipalRollup, RollupSourceError> {
        let principal_id = PrincipalId::new(self.principal_id.trim());
        let last_activity_at = match self.last_activity_at {
            Some(raw) => Some(parse_timestamp(&raw).ok_or_else(|| {
                RollupSourceError::InvalidTimestamp {
                    principal: principal_id.clone(),
                    value: raw.clone(),
                }
            })?),
            None => None,
        };

        Ok(PrincipalRollup {
            principal_id,
            principal_name: self.principal_name.trim().to_string(),
            rollup: ActivityRollup {
                total_interactions: self.total_interactions.unwrap_or_default(),
                total_opportunities: self.total_opportunities.unwrap_or_default(),
                product_count: self.product_count.unwrap_or_default(),
                last_activity_at,
            },
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Reads principal rollup exports (one row per principal) from CSV.
pub struct CsvRollupImporter;

impl CsvRollupImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<PrincipalRollup>, RollupSourceError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<PrincipalRollup>, RollupSourceError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut seen: HashSet<String> = HashSet::new();
        let mut rollups = Vec::new();

        for record in csv_reader.deserialize::<ExportRow>() {
            let row = record?;
            if row.principal_id.trim().is_empty() {
                debug!("skipping rollup row without principal_id");
                continue;
            }

            if !row.is_principal() {
                debug!(principal = %row.principal_id, "skipping non-principal organization");
                continue;
            }

            if !seen.insert(row.principal_id.trim().to_string()) {
                warn!(principal = %row.principal_id, "duplicate rollup row ignored");
                continue;
            }

            rollups.push(row.into_rollup()?);
        }

        Ok(rollups)
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    rollups: Vec<PrincipalRollup>,
    index: HashMap<PrincipalId, usize>,
}

impl Snapshot {
    fn new(rollups: Vec<PrincipalRollup>) -> Self {
        let index = rollups
            .iter()
            .enumerate()
            .map(|(position, record)| (record.principal_id.clone(), position))
            .collect();
        Self { rollups, index }
    }
}

/// Rollup source backed by a CSV export on disk. `refresh` re-reads the file
/// and swaps the snapshot in one step; a failed refresh keeps the old one.
pub struct CsvRollupSource {
    path: PathBuf,
    snapshot: RwLock<Snapshot>,
}

impl CsvRollupSource {
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, RollupSourceError> {
        let path = path.into();
        let rollups = CsvRollupImporter::from_path(&path)?;
        info!(path = %path.display(), principals = rollups.len(), "loaded rollup export");
        Ok(Self {
            path,
            snapshot: RwLock::new(Snapshot::new(rollups)),
        })
    }
}

fn poisoned() -> RollupSourceError {
    RollupSourceError::Unavailable("rollup snapshot lock poisoned".to_string())
}

impl RollupSource for CsvRollupSource {
    fn fetch(&self, id: &PrincipalId) -> Result<Option<PrincipalRollup>, RollupSourceError> {
        let guard = self.snapshot.read().map_err(|_| poisoned())?;
        Ok(guard
            .index
            .get(id)
            .and_then(|position| guard.rollups.get(*position))
            .cloned())
    }

    fn fetch_all(&self) -> Result<Vec<PrincipalRollup>, RollupSourceError> {
        let guard = self.snapshot.read().map_err(|_| poisoned())?;
        Ok(guard.rollups.clone())
    }

    fn refresh(&self) -> Result<RefreshSummary, RollupSourceError> {
        let rollups = CsvRollupImporter::from_path(&self.path)?;
        let principals = rollups.len();
        let snapshot = Snapshot::new(rollups);

        let mut guard = self.snapshot.write().map_err(|_| poisoned())?;
        *guard = snapshot;

        Ok(RefreshSummary {
            principals,
            refreshed_at: Utc::now(),
        })
    }
}

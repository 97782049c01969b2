use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::error::CatalogError;
use super::parsing::parse_multi_tle;
use super::record::SatelliteRecord;

/// Name-keyed element sets persisted as one JSON file.
#[derive(Debug)]
pub struct TleCache {
    path: PathBuf,
    records: BTreeMap<String, SatelliteRecord>,
}

impl TleCache {
    /// Opens the cache, starting empty when the file is missing or unreadable.
    pub fn open(path: PathBuf) -> Self {
        let records = match Self::read_file(&path) {
            Ok(records) => records,
            Err(CatalogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Ignoring unreadable TLE cache {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, records }
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, SatelliteRecord>, CatalogError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&SatelliteRecord> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &SatelliteRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replaces any record of the same name.
    pub fn insert(&mut self, record: SatelliteRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Parses every set in a TLE file and caches it. Invalid sets are logged
    /// and skipped; the number accepted is returned.
    pub fn import_file(&mut self, tle_file: &Path, fetched_at: i64) -> Result<usize, CatalogError> {
        let content = fs::read_to_string(tle_file)?;
        let mut accepted = 0;
        for tle in parse_multi_tle(&content) {
            match SatelliteRecord::from_tle(&tle, None, fetched_at) {
                Ok(record) => {
                    self.insert(record);
                    accepted += 1;
                }
                Err(e) => warn!("Skipping TLE in {}: {}", tle_file.display(), e),
            }
        }
        Ok(accepted)
    }

    pub fn save(&self) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, content)?;
        info!("Saved {} TLE record(s) to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use super::error::PersistError;
use super::snapshot::Snapshot;

/// Structured fallback copy on the wear-limited medium.
#[derive(Debug, Clone)]
pub struct FlashFile {
    path: PathBuf,
}

impl FlashFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // An interrupted write leaves the previous copy in place.
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Snapshot, PersistError> {
        let content = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&content)?)
    }
}

use log::{debug, info, warn};
use strum_macros::Display;

use crate::bus::SharedBus;

use super::error::PersistError;
use super::flash::FlashFile;
use super::snapshot::{Snapshot, SNAPSHOT_LEN};
use super::store::NvStore;

/// Where a snapshot was written to or read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Tier {
    Nvm,
    Flash,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub snapshot: Snapshot,
    pub tier: Tier,
}

/// NVM first, flash file second.
///
/// A successful NVM write skips the flash copy entirely.
pub struct PersistManager<S> {
    nvm: Option<SharedBus<S>>,
    nvm_offset: usize,
    flash: FlashFile,
}

impl<S: NvStore> PersistManager<S> {
    pub fn new(nvm: Option<SharedBus<S>>, flash: FlashFile) -> Self {
        Self {
            nvm,
            nvm_offset: 0,
            flash,
        }
    }

    pub fn with_nvm_offset(mut self, offset: usize) -> Self {
        self.nvm_offset = offset;
        self
    }

    pub fn flash(&self) -> &FlashFile {
        &self.flash
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<Tier, PersistError> {
        let bytes = snapshot.encode();

        if let Some(nvm) = &self.nvm {
            let offset = self.nvm_offset;
            match nvm.transaction(|store| store.write(offset, &bytes)) {
                Ok(()) => {
                    debug!("Snapshot saved to NVM at ts={}", snapshot.timestamp);
                    return Ok(Tier::Nvm);
                }
                Err(e) => warn!("NVM save failed, falling back to flash: {}", e),
            }
        }

        self.flash.save(snapshot)?;
        info!("Snapshot saved to {} at ts={}", self.flash.path().display(), snapshot.timestamp);
        Ok(Tier::Flash)
    }

    /// Newest valid snapshot, or `None` when no tier holds one.
    pub fn load(&self) -> Option<Loaded> {
        if let Some(nvm) = &self.nvm {
            let offset = self.nvm_offset;
            let read = nvm
                .transaction(|store| store.read(offset, SNAPSHOT_LEN))
                .map_err(PersistError::from)
                .and_then(|bytes| {
                    if bytes.iter().all(|&b| b == 0) {
                        debug!("NVM window is blank");
                    }
                    Snapshot::decode(&bytes).map_err(PersistError::from)
                });
            match read {
                Ok(snapshot) => {
                    info!("State recovered from NVM (ts={})", snapshot.timestamp);
                    return Some(Loaded {
                        snapshot,
                        tier: Tier::Nvm,
                    });
                }
                Err(e) => warn!("Discarding NVM snapshot: {}", e),
            }
        }

        match self.flash.load() {
            Ok(snapshot) => {
                info!("State recovered from flash (ts={})", snapshot.timestamp);
                Some(Loaded {
                    snapshot,
                    tier: Tier::Flash,
                })
            }
            Err(PersistError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No saved state found");
                None
            }
            Err(e) => {
                warn!("Discarding flash snapshot: {}", e);
                None
            }
        }
    }
}

/// Reconstructs an absolute angle from a reading known only modulo 360,
/// choosing the turn (the saved one, or one either side) closest to `saved_deg`.
pub fn resolve_absolute_from_modulo(saved_deg: f64, raw_deg: f64) -> f64 {
    let base_turn = (saved_deg / 360.0).floor();
    let raw = raw_deg.rem_euclid(360.0);
    [-1.0, 0.0, 1.0]
        .into_iter()
        .map(|offset| (base_turn + offset) * 360.0 + raw)
        .fold(f64::NAN, |best, candidate| {
            if best.is_nan() || (candidate - saved_deg).abs() < (best - saved_deg).abs() {
                candidate
            } else {
                best
            }
        })
}

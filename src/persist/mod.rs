mod catchup;
mod error;
mod flash;
mod manager;
mod snapshot;
mod store;

pub use catchup::{bounded_elapsed, expected_angles, extrapolate_circular, extrapolate_elliptical};
pub use error::PersistError;
pub use flash::FlashFile;
pub use manager::{resolve_absolute_from_modulo, Loaded, PersistManager, Tier};
pub use snapshot::{checksum, Snapshot, SnapshotError, SnapshotMode, SNAPSHOT_LEN, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
pub use store::{FileNvStore, MemoryNvStore, NvStore, StoreError};

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("range {offset}+{len} outside a {capacity} byte store")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
    #[error("store unavailable")]
    Unavailable,
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Small battery-backed memory window addressed from zero.
pub trait NvStore: Send {
    fn capacity(&self) -> usize;

    fn read(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, StoreError>;

    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError>;
}

fn check_bounds(offset: usize, len: usize, capacity: usize) -> Result<(), StoreError> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(StoreError::OutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct MemoryNvStore {
    bytes: Vec<u8>,
    available: bool,
}

impl MemoryNvStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            available: true,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}

impl NvStore for MemoryNvStore {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, StoreError> {
        if !self.available {
            return Err(StoreError::Unavailable);
        }
        check_bounds(offset, len, self.bytes.len())?;
        Ok(self.bytes[offset..offset + len].to_vec())
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
        if !self.available {
            return Err(StoreError::Unavailable);
        }
        check_bounds(offset, bytes.len(), self.bytes.len())?;
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// A fixed-size image file standing in for the RTC's SRAM.
#[derive(Debug)]
pub struct FileNvStore {
    path: PathBuf,
    capacity: usize,
}

impl FileNvStore {
    /// Creates a zero-filled image when none exists. An existing image is
    /// padded or cut to `capacity`.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.set_len(capacity as u64)?;
        Ok(Self { path, capacity })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NvStore for FileNvStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, StoreError> {
        check_bounds(offset, len, self.capacity)?;
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        let mut buf = vec![0; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
        check_bounds(offset, bytes.len(), self.capacity)?;
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(bytes)?;
        file.sync_data()?;
        Ok(())
    }
}

//! # Address-space layers
//!
//! A layer maps process-virtual addresses to raw bytes. Plugins never touch
//! the capture format directly: they ask a layer whether an address is
//! mapped and read byte ranges from it.
//!
//! Reads are all-or-nothing. If any byte of the requested range is not
//! mapped the read fails with [`LayerError::UnmappedPage`], naming the
//! first address that could not be resolved. Callers that scan memory
//! treat that error as an ordinary loop terminator rather than a fatal
//! condition.
//!
//! ## Implementations
//!
//! - [`PagedLayer`]: sparse in-memory pages, used to build synthetic
//!   address spaces.
//! - [`FileLayer`]: virtual regions backed by byte ranges of a raw memory
//!   image on disk. Reads are plain blocking file I/O.

pub mod file;
pub mod paged;

pub use file::FileLayer;
pub use paged::PagedLayer;

use crate::domain::LayerError;

/// Read-only view of a virtual address space
///
/// Implementations must be safe to share between threads so callers can
/// scan several processes in parallel if they choose to.
pub trait MemoryLayer: Send + Sync {
    /// Layer name, used in error messages and logs
    fn name(&self) -> &str;

    /// Check whether a single address is mapped
    fn is_valid(&self, addr: u64) -> bool;

    /// Read `len` bytes starting at `addr`
    ///
    /// # Errors
    /// Returns [`LayerError::UnmappedPage`] if any byte of the range is not
    /// mapped, or [`LayerError::Io`] if the backing store fails.
    fn read(&self, addr: u64, len: usize) -> Result<Vec<u8>, LayerError>;
}

/// A contiguous virtual address range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// End address of a read, or an overflow error
pub(crate) fn read_end(addr: u64, len: usize) -> Result<u64, LayerError> {
    u64::try_from(len)
        .ok()
        .and_then(|len| addr.checked_add(len))
        .ok_or(LayerError::AddressOverflow { addr, len })
}

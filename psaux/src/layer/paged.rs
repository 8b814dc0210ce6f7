//! Sparse in-memory address space

use std::collections::BTreeMap;

use super::{read_end, MemoryLayer};
use crate::domain::LayerError;

/// Page granularity of [`PagedLayer`]
pub const PAGE_SIZE: u64 = 0x1000;

/// Address space built from individually mapped 4 KiB pages
///
/// Pages that were never written stay unmapped, so a [`PagedLayer`] can
/// model holes, torn captures and partially resident argument areas.
#[derive(Debug, Clone)]
pub struct PagedLayer {
    name: String,
    pages: BTreeMap<u64, Box<[u8]>>,
}

impl PagedLayer {
    /// Create an empty layer
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), pages: BTreeMap::new() }
    }

    /// Write `bytes` at `addr`, mapping zero-filled pages as needed
    ///
    /// # Panics
    /// Panics if the range wraps past the end of the address space.
    #[must_use]
    pub fn with_bytes(mut self, addr: u64, bytes: &[u8]) -> Self {
        self.write(addr, bytes);
        self
    }

    /// Map `len` zero bytes starting at `addr`
    #[must_use]
    pub fn with_zeroed(mut self, addr: u64, len: usize) -> Self {
        self.write(addr, &vec![0; len]);
        self
    }

    /// Remove the page containing `addr`
    #[cfg(test)]
    #[must_use]
    pub fn without_page(mut self, addr: u64) -> Self {
        self.pages.remove(&page_base(addr));
        self
    }

    fn write(&mut self, addr: u64, mut bytes: &[u8]) {
        let mut at = addr;
        while !bytes.is_empty() {
            let page = self
                .pages
                .entry(page_base(at))
                .or_insert_with(|| vec![0; PAGE_SIZE as usize].into_boxed_slice());
            let from = page_offset(at);
            let n = bytes.len().min(page.len() - from);
            page[from..from + n].copy_from_slice(&bytes[..n]);
            bytes = &bytes[n..];
            at += n as u64;
        }
    }

    /// Number of mapped pages
    #[cfg(test)]
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl MemoryLayer for PagedLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self, addr: u64) -> bool {
        self.pages.contains_key(&page_base(addr))
    }

    fn read(&self, addr: u64, len: usize) -> Result<Vec<u8>, LayerError> {
        let end = read_end(addr, len)?;
        let mut out = Vec::with_capacity(len);
        let mut cur = addr;

        while cur < end {
            let base = page_base(cur);
            let page = self
                .pages
                .get(&base)
                .ok_or_else(|| LayerError::UnmappedPage { layer: self.name.clone(), addr: cur })?;
            let chunk_end = end.min(base.saturating_add(PAGE_SIZE));
            let from = page_offset(cur);
            #[allow(clippy::cast_possible_truncation)]
            let to = from + (chunk_end - cur) as usize;
            out.extend_from_slice(&page[from..to]);
            cur = chunk_end;
        }

        Ok(out)
    }
}

fn page_base(addr: u64) -> u64 {
    addr & !(PAGE_SIZE - 1)
}

#[allow(clippy::cast_possible_truncation)]
fn page_offset(addr: u64) -> usize {
    (addr & (PAGE_SIZE - 1)) as usize
}

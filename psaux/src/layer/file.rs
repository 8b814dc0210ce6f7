//! Layer backed by a raw memory image on disk

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use super::{read_end, MemoryLayer, MemoryRange};
use crate::domain::LayerError;

/// Virtual range mapped onto a byte range of the image file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub range: MemoryRange,
    pub file_offset: u64,
}

/// Process address space described by a list of image-backed regions
///
/// Regions are kept sorted by start address and must not overlap; the
/// capture loader enforces that before building a layer.
#[derive(Debug, Clone)]
pub struct FileLayer {
    name: String,
    image: Arc<File>,
    regions: Vec<Region>,
}

impl FileLayer {
    pub fn new(name: impl Into<String>, image: Arc<File>, mut regions: Vec<Region>) -> Self {
        regions.sort_by_key(|r| r.range.start);
        Self { name: name.into(), image, regions }
    }

    fn region_for(&self, addr: u64) -> Option<&Region> {
        let idx = self.regions.partition_point(|r| r.range.end <= addr);
        self.regions.get(idx).filter(|r| r.range.contains(addr))
    }
}

impl MemoryLayer for FileLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self, addr: u64) -> bool {
        self.region_for(addr).is_some()
    }

    fn read(&self, addr: u64, len: usize) -> Result<Vec<u8>, LayerError> {
        let end = read_end(addr, len)?;
        let mut out = vec![0; len];
        let mut cur = addr;

        // Regions may be adjacent; a read is valid as long as every byte
        // resolves to some region.
        while cur < end {
            let region = self
                .region_for(cur)
                .ok_or_else(|| LayerError::UnmappedPage { layer: self.name.clone(), addr: cur })?;
            let chunk_end = end.min(region.range.end);
            #[allow(clippy::cast_possible_truncation)]
            let (from, to) = ((cur - addr) as usize, (chunk_end - addr) as usize);
            let file_pos = region.file_offset + (cur - region.range.start);
            self.image.read_exact_at(&mut out[from..to], file_pos)?;
            cur = chunk_end;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn image(bytes: &[u8]) -> Arc<File> {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(bytes).unwrap();
        Arc::new(file)
    }

    fn region(start: u64, end: u64, file_offset: u64) -> Region {
        Region { range: MemoryRange { start, end }, file_offset }
    }

    #[test]
    fn test_read_single_region() {
        let layer = FileLayer::new("proc", image(b"xxhelloxx"), vec![region(0x1000, 0x1009, 0)]);
        assert!(layer.is_valid(0x1000));
        assert!(!layer.is_valid(0x1009));
        assert_eq!(layer.read(0x1002, 5).unwrap(), b"hello");
    }

    #[test]
    fn test_read_spans_adjacent_regions() {
        // Second region maps the start of the file right after the first
        let layer = FileLayer::new(
            "proc",
            image(b"abcdef"),
            vec![region(0x2003, 0x2006, 0), region(0x2000, 0x2003, 3)],
        );
        assert_eq!(layer.read(0x2000, 6).unwrap(), b"defabc");
    }

    #[test]
    fn test_read_past_region_is_unmapped() {
        let layer = FileLayer::new("proc", image(b"abcd"), vec![region(0x3000, 0x3004, 0)]);
        let err = layer.read(0x3002, 4).unwrap_err();
        assert!(err.is_unmapped());
    }

    #[test]
    fn test_short_image_is_io_error() {
        // Region claims more bytes than the image holds
        let layer = FileLayer::new("proc", image(b"ab"), vec![region(0x4000, 0x4010, 0)]);
        let err = layer.read(0x4000, 8).unwrap_err();
        assert!(!err.is_unmapped());
    }
}

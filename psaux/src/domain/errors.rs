//! Structured error types for psaux
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Pid;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reading from an address-space layer
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Address 0x{addr:x} is not mapped in layer {layer}")]
    UnmappedPage { layer: String, addr: u64 },

    #[error("Read of {len} bytes at 0x{addr:x} overflows the address space")]
    AddressOverflow { addr: u64, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LayerError {
    /// True for the expected "page not resident" outcome, as opposed to
    /// a backing-store failure.
    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        matches!(self, LayerError::UnmappedPage { .. } | LayerError::AddressOverflow { .. })
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to read capture manifest {}: {source}", path.display())]
    ManifestRead { path: PathBuf, source: std::io::Error },

    #[error("Invalid capture manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    #[error("Failed to open memory image {}: {source}", path.display())]
    ImageOpen { path: PathBuf, source: std::io::Error },

    #[error("Region 0x{address:x}+0x{length:x} of {pid} lies outside the memory image")]
    RegionOutOfBounds { pid: Pid, address: u64, length: u64 },

    #[error("Region at 0x{address:x} of {pid} overlaps another region")]
    OverlappingRegions { pid: Pid, address: u64 },
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Unknown plugin '{0}'")]
    UnknownPlugin(String),

    #[error("Unable to validate the plugin requirements: {}", .0.join(", "))]
    Unsatisfied(Vec<String>),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_page_display() {
        let err = LayerError::UnmappedPage { layer: "primary".to_string(), addr: 0x7fff_0000 };
        assert_eq!(err.to_string(), "Address 0x7fff0000 is not mapped in layer primary");
        assert!(err.is_unmapped());
    }

    #[test]
    fn test_io_error_is_not_unmapped() {
        let err = LayerError::from(std::io::Error::other("disk gone"));
        assert!(!err.is_unmapped());
    }

    #[test]
    fn test_unsatisfied_lists_requirements() {
        let err = PluginError::Unsatisfied(vec!["primary".to_string(), "darwin".to_string()]);
        assert_eq!(
            err.to_string(),
            "Unable to validate the plugin requirements: primary, darwin"
        );
    }

    #[test]
    fn test_region_error_mentions_pid() {
        let err = CaptureError::RegionOutOfBounds { pid: Pid(7), address: 0x1000, length: 0x10 };
        assert!(err.to_string().contains("PID:7"));
    }
}

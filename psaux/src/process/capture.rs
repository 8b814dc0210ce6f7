//! Capture manifests
//!
//! A capture is a JSON manifest describing the tasks found in a memory
//! image, plus the raw image file itself. Each task lists the virtual
//! regions of its address space and where their bytes live in the image.
//!
//! ```json
//! {
//!   "image": "memory.raw",
//!   "layer": { "name": "primary", "architecture": "Intel64" },
//!   "symbol_tables": ["darwin"],
//!   "tasks": [
//!     { "pid": 1, "comm": "launchd", "user_stack": 8192, "argslen": 24, "argc": 1,
//!       "regions": [ { "address": 4096, "length": 4096, "offset": 0 } ] }
//!   ]
//! }
//! ```

use log::{debug, info};
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{PidFilter, ProcessSource, TaskRecord};
use crate::domain::{Architecture, CaptureError, Pid};
use crate::layer::file::Region;
use crate::layer::MemoryRange;

#[derive(Debug, Deserialize)]
struct Manifest {
    image: PathBuf,
    layer: LayerSpec,
    #[serde(default)]
    symbol_tables: Vec<String>,
    #[serde(default)]
    tasks: Vec<TaskSpec>,
}

#[derive(Debug, Deserialize)]
struct LayerSpec {
    name: String,
    architecture: Architecture,
}

#[derive(Debug, Deserialize)]
struct TaskSpec {
    pid: Pid,
    comm: String,
    user_stack: u64,
    argslen: u64,
    argc: u64,
    #[serde(default)]
    regions: Vec<RegionSpec>,
}

#[derive(Debug, Deserialize)]
struct RegionSpec {
    address: u64,
    length: u64,
    offset: u64,
}

/// A loaded capture: kernel layer description plus its tasks
#[derive(Debug)]
pub struct Capture {
    pub layer_name: String,
    pub architecture: Architecture,
    pub symbol_tables: Vec<String>,
    pub image_path: PathBuf,
    tasks: Vec<TaskRecord>,
}

impl Capture {
    /// Load a manifest and open the image it references
    ///
    /// The image path is resolved relative to the manifest's directory.
    ///
    /// # Errors
    /// Returns an error if the manifest cannot be read or parsed, the image
    /// cannot be opened, or a region is out of bounds or overlapping.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| CaptureError::ManifestRead { path: path.to_path_buf(), source })?;
        let manifest: Manifest = serde_json::from_str(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let image_path = base.join(&manifest.image);
        let image = File::open(&image_path)
            .map_err(|source| CaptureError::ImageOpen { path: image_path.clone(), source })?;
        let image_len = image
            .metadata()
            .map_err(|source| CaptureError::ImageOpen { path: image_path.clone(), source })?
            .len();
        let image = Arc::new(image);

        let mut tasks = Vec::with_capacity(manifest.tasks.len());
        for spec in manifest.tasks {
            let regions = build_regions(spec.pid, &spec.regions, image_len)?;
            let mapped: u64 = regions.iter().map(|r| r.range.len()).sum();
            debug!(
                "{}: {} regions ({mapped} bytes), argc={} argslen={}",
                spec.pid,
                regions.len(),
                spec.argc,
                spec.argslen
            );
            let layer_name = format!("{}_Process{}", manifest.layer.name, spec.pid.0);
            tasks.push(
                TaskRecord::new(spec.pid.0, &spec.comm, spec.user_stack, spec.argslen, spec.argc)
                    .with_image_regions(layer_name, Arc::clone(&image), regions),
            );
        }

        info!(
            "Loaded capture {} ({} tasks, {} KB image)",
            path.display(),
            tasks.len(),
            image_len / 1024
        );

        Ok(Self {
            layer_name: manifest.layer.name,
            architecture: manifest.layer.architecture,
            symbol_tables: manifest.symbol_tables,
            image_path,
            tasks,
        })
    }

    /// Number of tasks in the capture
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl ProcessSource for Capture {
    fn tasks<'a>(
        &'a self,
        kernel_layer: &str,
        filter: PidFilter,
    ) -> Box<dyn Iterator<Item = TaskRecord> + 'a> {
        debug!("Enumerating tasks of {} through layer {kernel_layer}", self.image_path.display());
        self.tasks.tasks(kernel_layer, filter)
    }
}

/// Validate region specs against the image and each other
fn build_regions(pid: Pid, specs: &[RegionSpec], image_len: u64) -> Result<Vec<Region>, CaptureError> {
    let mut regions = Vec::with_capacity(specs.len());

    for spec in specs {
        let out_of_bounds =
            CaptureError::RegionOutOfBounds { pid, address: spec.address, length: spec.length };
        let Some(end) = spec.address.checked_add(spec.length) else {
            return Err(out_of_bounds);
        };
        match spec.offset.checked_add(spec.length) {
            Some(file_end) if file_end <= image_len => {}
            _ => return Err(out_of_bounds),
        }
        let range = MemoryRange { start: spec.address, end };
        if range.is_empty() {
            continue;
        }
        regions.push(Region { range, file_offset: spec.offset });
    }

    regions.sort_by_key(|r| r.range.start);
    for pair in regions.windows(2) {
        if pair[1].range.start < pair[0].range.end {
            return Err(CaptureError::OverlappingRegions { pid, address: pair[1].range.start });
        }
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRecord;

    fn write_capture(dir: &Path, manifest: &serde_json::Value, image: &[u8]) -> PathBuf {
        fs::write(dir.join("memory.raw"), image).unwrap();
        let path = dir.join("capture.json");
        fs::write(&path, serde_json::to_vec(manifest).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_capture() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = serde_json::json!({
            "image": "memory.raw",
            "layer": { "name": "primary", "architecture": "Intel64" },
            "symbol_tables": ["darwin"],
            "tasks": [
                { "pid": 1, "comm": "launchd", "user_stack": 0x2000, "argslen": 8, "argc": 1,
                  "regions": [ { "address": 0x1000, "length": 0x1000, "offset": 0 } ] },
                { "pid": 2, "comm": "kernel_task", "user_stack": 0, "argslen": 0, "argc": 0 }
            ]
        });
        let path = write_capture(dir.path(), &manifest, &[0u8; 0x1000]);

        let capture = Capture::load(&path).unwrap();
        assert_eq!(capture.task_count(), 2);
        assert_eq!(capture.architecture, Architecture::Intel64);
        assert_eq!(capture.symbol_tables, vec!["darwin".to_string()]);

        let tasks: Vec<TaskRecord> = capture.tasks("primary", PidFilter::all()).collect();
        let layer = tasks[0].materialize_layer().unwrap();
        assert_eq!(layer.name(), "primary_Process1");
        assert!(layer.is_valid(0x1FFF));
        assert!(tasks[1].materialize_layer().is_none());
    }

    #[test]
    fn test_region_outside_image() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = serde_json::json!({
            "image": "memory.raw",
            "layer": { "name": "primary", "architecture": "Intel64" },
            "tasks": [
                { "pid": 9, "comm": "x", "user_stack": 0, "argslen": 0, "argc": 0,
                  "regions": [ { "address": 0x1000, "length": 0x2000, "offset": 0 } ] }
            ]
        });
        let path = write_capture(dir.path(), &manifest, &[0u8; 0x1000]);

        let err = Capture::load(&path).unwrap_err();
        assert!(matches!(err, CaptureError::RegionOutOfBounds { pid: Pid(9), .. }));
    }

    #[test]
    fn test_overlapping_regions() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = serde_json::json!({
            "image": "memory.raw",
            "layer": { "name": "primary", "architecture": "Intel32" },
            "tasks": [
                { "pid": 3, "comm": "x", "user_stack": 0, "argslen": 0, "argc": 0,
                  "regions": [
                      { "address": 0x1000, "length": 0x100, "offset": 0 },
                      { "address": 0x1080, "length": 0x100, "offset": 0x100 }
                  ] }
            ]
        });
        let path = write_capture(dir.path(), &manifest, &[0u8; 0x200]);

        let err = Capture::load(&path).unwrap_err();
        assert!(matches!(err, CaptureError::OverlappingRegions { address: 0x1080, .. }));
    }

    #[test]
    fn test_empty_regions_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = serde_json::json!({
            "image": "memory.raw",
            "layer": { "name": "primary", "architecture": "Intel64" },
            "tasks": [
                { "pid": 4, "comm": "x", "user_stack": 0, "argslen": 0, "argc": 0,
                  "regions": [
                      { "address": 0x1000, "length": 0x100, "offset": 0 },
                      { "address": 0x1080, "length": 0, "offset": 0x100 }
                  ] },
                { "pid": 5, "comm": "y", "user_stack": 0, "argslen": 0, "argc": 0,
                  "regions": [ { "address": 0x1000, "length": 0, "offset": 0 } ] }
            ]
        });
        let path = write_capture(dir.path(), &manifest, &[0u8; 0x200]);

        let capture = Capture::load(&path).unwrap();
        let tasks: Vec<TaskRecord> = capture.tasks("primary", PidFilter::all()).collect();
        assert!(tasks[0].materialize_layer().unwrap().is_valid(0x10FF));
        assert!(tasks[1].materialize_layer().is_none());
    }

    #[test]
    fn test_missing_manifest() {
        let err = Capture::load("/nonexistent/capture.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read capture manifest"));
    }

    #[test]
    fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        fs::write(
            &path,
            r#"{ "image": "absent.raw", "layer": { "name": "primary", "architecture": "Intel64" } }"#,
        )
        .unwrap();

        let err = Capture::load(&path).unwrap_err();
        assert!(matches!(err, CaptureError::ImageOpen { .. }));
    }
}

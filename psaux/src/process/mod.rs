//! Process records and the sources that enumerate them
//!
//! A [`ProcessRecord`] carries the per-task metadata the argument scanner
//! needs (stack top, argument area length, argument count) together with a
//! way to materialize the task's private address space. Records are cheap
//! to clone: the layer is only built when a consumer asks for it.

pub mod capture;

pub use capture::Capture;

use std::fmt;
use std::fs::File;
use std::sync::Arc;

use crate::domain::Pid;
use crate::layer::file::Region;
use crate::layer::{FileLayer, MemoryLayer};

/// Maximum length of a kernel process name, excluding the terminator
pub const MAXCOMLEN: usize = 16;

/// Fixed-width process name buffer as stored in the kernel task
pub type CommBuffer = [u8; MAXCOMLEN + 1];

/// Per-process metadata consumed by plugins
pub trait ProcessRecord {
    fn pid(&self) -> Pid;

    /// Raw fixed-width name buffer
    fn name_buffer(&self) -> &[u8];

    /// Address just past the argument area (top of the user stack)
    fn stack_top(&self) -> u64;

    /// Declared size in bytes of the argument area
    fn arg_byte_length(&self) -> u64;

    /// Declared number of arguments
    fn arg_count(&self) -> u64;

    /// Build the private address space of this process, if possible
    fn materialize_layer(&self) -> Option<Arc<dyn MemoryLayer>>;

    /// Name buffer up to its first NUL, decoded lossily
    fn name(&self) -> String {
        buffer_to_string(self.name_buffer())
    }
}

/// Decode a NUL-terminated byte buffer
#[must_use]
pub fn buffer_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Copy a name into a fixed-width buffer, truncating to [`MAXCOMLEN`]
#[must_use]
pub fn comm_buffer(name: &str) -> CommBuffer {
    let mut buf = [0; MAXCOMLEN + 1];
    let bytes = name.as_bytes();
    let len = bytes.len().min(MAXCOMLEN);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

/// Where a task's private layer comes from
#[derive(Clone)]
enum LayerBacking {
    Unavailable,
    Shared(Arc<dyn MemoryLayer>),
    Image { name: String, image: Arc<File>, regions: Vec<Region> },
}

/// A task as recovered from a capture
#[derive(Clone)]
pub struct TaskRecord {
    pub pid: Pid,
    pub comm: CommBuffer,
    pub user_stack: u64,
    pub argslen: u64,
    pub argc: u64,
    backing: LayerBacking,
}

impl TaskRecord {
    /// Create a task without an address space
    pub fn new(pid: u32, comm: &str, user_stack: u64, argslen: u64, argc: u64) -> Self {
        Self {
            pid: Pid(pid),
            comm: comm_buffer(comm),
            user_stack,
            argslen,
            argc,
            backing: LayerBacking::Unavailable,
        }
    }

    /// Attach an already built layer
    #[must_use]
    pub fn with_layer(mut self, layer: Arc<dyn MemoryLayer>) -> Self {
        self.backing = LayerBacking::Shared(layer);
        self
    }

    /// Attach image regions; the layer is built on demand
    #[must_use]
    pub fn with_image_regions(
        mut self,
        name: impl Into<String>,
        image: Arc<File>,
        regions: Vec<Region>,
    ) -> Self {
        self.backing = if regions.is_empty() {
            LayerBacking::Unavailable
        } else {
            LayerBacking::Image { name: name.into(), image, regions }
        };
        self
    }
}

impl ProcessRecord for TaskRecord {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn name_buffer(&self) -> &[u8] {
        &self.comm
    }

    fn stack_top(&self) -> u64 {
        self.user_stack
    }

    fn arg_byte_length(&self) -> u64 {
        self.argslen
    }

    fn arg_count(&self) -> u64 {
        self.argc
    }

    fn materialize_layer(&self) -> Option<Arc<dyn MemoryLayer>> {
        match &self.backing {
            LayerBacking::Unavailable => None,
            LayerBacking::Shared(layer) => Some(Arc::clone(layer)),
            LayerBacking::Image { name, image, regions } => Some(Arc::new(FileLayer::new(
                name.clone(),
                Arc::clone(image),
                regions.clone(),
            ))),
        }
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("pid", &self.pid)
            .field("comm", &self.name())
            .field("user_stack", &format_args!("0x{:x}", self.user_stack))
            .field("argslen", &self.argslen)
            .field("argc", &self.argc)
            .field("has_layer", &!matches!(self.backing, LayerBacking::Unavailable))
            .finish()
    }
}

/// Restricts enumeration to a single process id, or passes everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PidFilter(Option<Pid>);

impl PidFilter {
    #[must_use]
    pub fn all() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn only(pid: Pid) -> Self {
        Self(Some(pid))
    }

    #[must_use]
    pub fn matches(&self, pid: Pid) -> bool {
        self.0.is_none() || self.0 == Some(pid)
    }
}

impl From<Option<Pid>> for PidFilter {
    fn from(pid: Option<Pid>) -> Self {
        Self(pid)
    }
}

/// Enumerates the tasks of a capture
pub trait ProcessSource {
    /// Iterate over the tasks visible through `kernel_layer`, in capture
    /// order, keeping only those accepted by `filter`
    fn tasks<'a>(
        &'a self,
        kernel_layer: &str,
        filter: PidFilter,
    ) -> Box<dyn Iterator<Item = TaskRecord> + 'a>;
}

impl ProcessSource for Vec<TaskRecord> {
    fn tasks<'a>(
        &'a self,
        _kernel_layer: &str,
        filter: PidFilter,
    ) -> Box<dyn Iterator<Item = TaskRecord> + 'a> {
        Box::new(self.iter().filter(move |t| filter.matches(t.pid)).cloned())
    }
}

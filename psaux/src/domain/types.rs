//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep process ids apart from the many other
//! integers that flow through a capture (addresses, lengths, counts).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID
///
/// Represents a process ID as recorded in the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// Instruction set of a translation layer
///
/// Plugins restrict themselves to a set of architectures through their
/// translation-layer requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    Intel32,
    Intel64,
    Aarch64,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::Intel32 => "Intel32",
            Architecture::Intel64 => "Intel64",
            Architecture::Aarch64 => "Aarch64",
        };
        f.write_str(name)
    }
}

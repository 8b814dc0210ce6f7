//! # psaux - Command Line Recovery from Memory Captures
//!
//! psaux reconstructs the command line (`argv`) of every process found in a
//! memory capture by scanning the argument area at the top of each
//! process's user stack. Captures are frequently inconsistent: task
//! metadata and memory pages are copied at different moments, pages are
//! missing, and counts can be garbage. The scanner is built to keep going
//! through all of that and to bound the work it does per process.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Capture    │──▶│   Context    │──▶│    Plugin    │──▶│   Renderer   │
//! │ (manifest +  │   │ (layers,     │   │ (mac.psaux,  │   │ (quick,      │
//! │  raw image)  │   │  symbols)    │   │  mac.pslist) │   │  json)       │
//! └──────────────┘   └──────────────┘   └──────┬───────┘   └──────────────┘
//!                                              │ reads
//!                                              ▼
//!                                       ┌──────────────┐
//!                                       │ MemoryLayer  │
//!                                       │ (per task)   │
//!                                       └──────────────┘
//! ```
//!
//! Everything downstream of the capture is pulled lazily: the renderer asks
//! for a row, the plugin pulls the next task, builds that task's layer and
//! scans it. No result set is materialized.
//!
//! ## Module Structure
//!
//! - [`layer`]: the [`MemoryLayer`](layer::MemoryLayer) trait with sparse
//!   in-memory and image-backed implementations
//! - [`process`]: task records, PID filtering and capture loading
//! - [`context`]: named kernel layers and symbol tables
//! - [`plugins`]: the plugin trait, requirement checks, the registry, and
//!   the `mac.psaux` argument scanner
//! - [`render`]: lazy tabular output
//! - [`config`]: per-component configuration with layered overrides
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: core domain types and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Command lines of every process in the capture
//! psaux --capture capture.json
//!
//! # One process, as JSON
//! RUST_LOG=debug psaux --capture capture.json --pid 412 --renderer json
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod layer;
pub mod plugins;
pub mod process;
pub mod render;

//! Command-line argument recovery (`mac.psaux`)
//!
//! The kernel records, per task, where the user stack ends (`user_stack`),
//! how many bytes of argument strings sit just below it (`argslen`) and how
//! many arguments there are (`argc`). The argument area therefore starts at
//! `user_stack - argslen` and holds NUL-terminated strings:
//!
//! ```text
//!  start                                                     user_stack
//!    │                                                            │
//!    ▼                                                            ▼
//!    exec_path\0 \0\0\0 argv[0]\0 argv[1]\0 ... argv[argc-1]\0 env...
//!    └────────┘ └─────┘ └──────┘
//!    duplicate  padding  usually equal to exec_path
//! ```
//!
//! The executable path is stored once more in front of `argv[0]`, followed
//! by NUL padding for word alignment. The scanner reads one extra string to
//! account for it, skips the padding after the first string, and drops any
//! later string equal to the first one.
//!
//! ## Tolerating smeared captures
//!
//! The task metadata and the argument bytes are captured at different
//! moments, so they can disagree. The scanner never trusts them beyond
//! fixed bounds:
//!
//! - at most [`MAX_ARGUMENTS`] strings are read; a task claiming more is
//!   treated as corrupted and skipped entirely
//! - every read is at most [`ARGUMENT_WINDOW`] bytes and never extends past
//!   `user_stack`
//! - an unmapped page ends the scan, keeping what was already recovered
//!
//! ## Text decoding
//!
//! Argument bytes are decoded as UTF-8 lossily: invalid sequences become
//! U+FFFD and a warning names the task. A task with undecodable arguments
//! still produces its row and never stops the remaining tasks.

use log::{debug, warn};
use std::borrow::Cow;
use std::fmt;

use super::{Plugin, Requirement};
use crate::config::Config;
use crate::context::Context;
use crate::domain::{Architecture, LayerError, Pid};
use crate::layer::MemoryLayer;
use crate::process::{PidFilter, ProcessRecord};
use crate::render::{Column, ColumnType, Row, TreeGrid, Value};

/// Upper bound on strings read per task, including the leading duplicate
pub const MAX_ARGUMENTS: u64 = 1024;

/// Largest single read issued while scanning
pub const ARGUMENT_WINDOW: usize = 256;

const COLUMNS: [Column; 4] = [
    Column::new("PID", ColumnType::Int),
    Column::new("Process", ColumnType::Str),
    Column::new("Argc", ColumnType::Int),
    Column::new("Arguments", ColumnType::Str),
];

/// Recovered command line of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub pid: Pid,
    pub process_name: String,
    /// `argc` as recorded by the kernel
    pub raw_arg_count: u64,
    /// Recovered arguments joined by single spaces
    pub arguments: String,
}

impl ExtractionResult {
    #[must_use]
    pub fn into_row(self) -> Row {
        vec![
            Value::from(self.pid.0),
            Value::Str(self.process_name),
            Value::Int(self.raw_arg_count),
            Value::Str(self.arguments),
        ]
    }
}

/// Why a task produced no row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoLayer,
    ZeroArgsLen,
    ZeroArgc,
    /// `user_stack - argslen` underflowed or is not mapped
    InvalidStart,
    /// Declared argument count exceeds [`MAX_ARGUMENTS`]
    Smear { argc: u64 },
    NothingCaptured,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoLayer => f.write_str("process layer unavailable"),
            SkipReason::ZeroArgsLen => f.write_str("argslen is zero"),
            SkipReason::ZeroArgc => f.write_str("argc is zero"),
            SkipReason::InvalidStart => f.write_str("argument area start is not mapped"),
            SkipReason::Smear { argc } => {
                write!(f, "smear: argc {argc} exceeds {MAX_ARGUMENTS} strings")
            }
            SkipReason::NothingCaptured => f.write_str("no argument could be read"),
        }
    }
}

/// How the scan loop stopped
enum ScanEnd {
    /// Read every expected string, or reached `user_stack`
    Exhausted,
    Faulted(LayerError),
}

/// Recover the command line of a single task
///
/// # Errors
/// Returns the [`SkipReason`] when the task yields no row.
pub fn extract_arguments<R: ProcessRecord + ?Sized>(
    task: &R,
) -> Result<ExtractionResult, SkipReason> {
    let layer = task.materialize_layer().ok_or(SkipReason::NoLayer)?;

    let stack_top = task.stack_top();
    let argslen = task.arg_byte_length();
    let argc = task.arg_count();

    if argslen == 0 {
        return Err(SkipReason::ZeroArgsLen);
    }
    if argc == 0 {
        return Err(SkipReason::ZeroArgc);
    }
    let start = stack_top
        .checked_sub(argslen)
        .filter(|&start| layer.is_valid(start))
        .ok_or(SkipReason::InvalidStart)?;

    // One extra string for the duplicated executable path
    let count = argc.saturating_add(1);
    if count > MAX_ARGUMENTS {
        return Err(SkipReason::Smear { argc });
    }

    let (captured, end) = scan(layer.as_ref(), start, stack_top, count);
    if let ScanEnd::Faulted(err) = end {
        if err.is_unmapped() {
            debug!("{}: scan stopped after {} strings: {err}", task.pid(), captured.len());
        } else {
            warn!("{}: scan stopped after {} strings: {err}", task.pid(), captured.len());
        }
    }
    if captured.is_empty() {
        return Err(SkipReason::NothingCaptured);
    }

    Ok(ExtractionResult {
        pid: task.pid(),
        process_name: task.name(),
        raw_arg_count: argc,
        arguments: join_arguments(task.pid(), &captured),
    })
}

/// Read up to `count` NUL-terminated strings starting at `start`
fn scan(
    layer: &dyn MemoryLayer,
    start: u64,
    stack_top: u64,
    count: u64,
) -> (Vec<Vec<u8>>, ScanEnd) {
    let mut captured: Vec<Vec<u8>> = Vec::new();
    let mut offset = start;

    for _ in 0..count {
        if offset >= stack_top {
            break;
        }
        #[allow(clippy::cast_possible_truncation)]
        let len = (stack_top - offset).min(ARGUMENT_WINDOW as u64) as usize;
        let mut arg = match layer.read(offset, len) {
            Ok(window) => window,
            Err(err) => return (captured, ScanEnd::Faulted(err)),
        };
        if let Some(nul) = arg.iter().position(|&b| b == 0) {
            arg.truncate(nul);
        }

        offset = offset.saturating_add(arg.len() as u64 + 1);

        if captured.is_empty() {
            offset = skip_padding(layer, offset, stack_top);
            captured.push(arg);
        } else if arg != captured[0] {
            captured.push(arg);
        }
    }

    (captured, ScanEnd::Exhausted)
}

/// Advance past NUL bytes, stopping at `stack_top`, a non-NUL byte or an
/// unreadable address
///
/// Padding is read in [`ARGUMENT_WINDOW`] chunks. A chunk that faults is
/// retried byte by byte so the skip stops exactly at the first unreadable
/// address.
fn skip_padding(layer: &dyn MemoryLayer, mut offset: u64, stack_top: u64) -> u64 {
    while offset < stack_top {
        #[allow(clippy::cast_possible_truncation)]
        let len = (stack_top - offset).min(ARGUMENT_WINDOW as u64) as usize;
        let Ok(window) = layer.read(offset, len) else {
            return skip_padding_bytes(layer, offset, offset + len as u64);
        };
        match window.iter().position(|&b| b != 0) {
            Some(data) => return offset + data as u64,
            None => offset += len as u64,
        }
    }
    offset
}

fn skip_padding_bytes(layer: &dyn MemoryLayer, mut offset: u64, end: u64) -> u64 {
    while offset < end {
        match layer.read(offset, 1) {
            Ok(byte) if byte.first() == Some(&0) => offset += 1,
            _ => break,
        }
    }
    offset
}

fn join_arguments(pid: Pid, captured: &[Vec<u8>]) -> String {
    let decoded: Vec<Cow<'_, str>> =
        captured.iter().map(|arg| String::from_utf8_lossy(arg)).collect();
    if decoded.iter().any(|arg| matches!(arg, Cow::Owned(_))) {
        warn!("{pid}: arguments are not valid UTF-8, replaced undecodable bytes");
    }
    decoded.join(" ")
}

/// Lazy adapter turning tasks into recovered command lines
///
/// Pulls one task at a time from the upstream iterator and yields at most
/// one result per task, in order. Skipped tasks are logged and never
/// surface as errors.
pub struct ArgumentExtractor<I> {
    tasks: I,
}

impl<I> ArgumentExtractor<I> {
    pub fn new(tasks: I) -> Self {
        Self { tasks }
    }
}

impl<I> Iterator for ArgumentExtractor<I>
where
    I: Iterator,
    I::Item: ProcessRecord,
{
    type Item = ExtractionResult;

    fn next(&mut self) -> Option<Self::Item> {
        for task in self.tasks.by_ref() {
            match extract_arguments(&task) {
                Ok(result) => return Some(result),
                Err(reason @ SkipReason::Smear { .. }) => {
                    warn!("Skipping {} ({}): {reason}", task.pid(), task.name());
                }
                Err(reason) => debug!("Skipping {} ({}): {reason}", task.pid(), task.name()),
            }
        }
        None
    }
}

/// Recover command lines for every task of `tasks`
pub fn extract<I>(tasks: I) -> ArgumentExtractor<I::IntoIter>
where
    I: IntoIterator,
    I::Item: ProcessRecord,
{
    ArgumentExtractor::new(tasks.into_iter())
}

/// Recovers program command line arguments
pub struct Psaux;

impl Plugin for Psaux {
    fn name(&self) -> &'static str {
        "mac.psaux"
    }

    fn description(&self) -> &'static str {
        "Recovers program command line arguments"
    }

    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::TranslationLayer {
                name: "primary",
                description: "Kernel Address Space",
                architectures: &[Architecture::Intel32, Architecture::Intel64],
            },
            Requirement::Symbols { name: "darwin", description: "Mac Kernel" },
        ]
    }

    fn run<'a>(&self, ctx: &'a Context, config: &'a Config) -> TreeGrid<'a> {
        let tasks = ctx.tasks(
            &config.context.primary_layer,
            &config.context.symbol_table,
            PidFilter::from(config.filter.pid),
        );
        TreeGrid::new(COLUMNS.to_vec(), extract(tasks).map(ExtractionResult::into_row))
    }
}

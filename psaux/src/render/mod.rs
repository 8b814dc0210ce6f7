//! Tabular plugin output
//!
//! Plugins return a [`TreeGrid`]: typed column headers plus a lazy row
//! iterator. Renderers pull rows one at a time and write them as they
//! arrive, so nothing forces the whole result set into memory.

pub mod json;
pub mod quick;

pub use json::JsonLinesRenderer;
pub use quick::QuickTextRenderer;

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::domain::RenderError;

/// Column value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    /// Integer shown in hexadecimal by text renderers
    Hex,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    #[must_use]
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self { name, kind }
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(u64),
    Hex(u64),
    Str(String),
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(u64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

pub type Row = Vec<Value>;

/// Column headers plus a lazily evaluated row sequence
pub struct TreeGrid<'a> {
    pub columns: Vec<Column>,
    pub rows: Box<dyn Iterator<Item = Row> + 'a>,
}

impl<'a> TreeGrid<'a> {
    pub fn new(columns: Vec<Column>, rows: impl Iterator<Item = Row> + 'a) -> Self {
        Self { columns, rows: Box::new(rows) }
    }

    /// Column names in order
    #[must_use]
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

/// Writes a [`TreeGrid`] to an output stream
pub trait Renderer {
    /// Render every row of `grid`, returning the number of rows written
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails.
    fn render(&self, grid: TreeGrid<'_>, out: &mut dyn Write) -> Result<usize, RenderError>;
}

/// Output format selectable from the command line or config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Tab-separated text
    #[default]
    Quick,
    /// One JSON object per row
    Json,
}

impl RendererKind {
    #[must_use]
    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            RendererKind::Quick => Box::new(QuickTextRenderer),
            RendererKind::Json => Box::new(JsonLinesRenderer),
        }
    }
}

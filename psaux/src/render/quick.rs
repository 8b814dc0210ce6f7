//! Tab-separated text output

use std::io::Write;

use super::{Renderer, TreeGrid, Value};
use crate::domain::RenderError;

/// Header line, blank line, then one tab-separated line per row
pub struct QuickTextRenderer;

impl Renderer for QuickTextRenderer {
    fn render(&self, grid: TreeGrid<'_>, out: &mut dyn Write) -> Result<usize, RenderError> {
        writeln!(out, "{}\n", grid.column_names().join("\t"))?;

        let mut count = 0;
        for row in grid.rows {
            let cells: Vec<String> = row.iter().map(format_cell).collect();
            writeln!(out, "{}", cells.join("\t"))?;
            count += 1;
        }
        out.flush()?;
        Ok(count)
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Hex(v) => format!("0x{v:x}"),
        Value::Str(s) => s.clone(),
    }
}

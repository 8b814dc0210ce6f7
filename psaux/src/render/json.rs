//! JSON Lines output

use serde_json::{Map, Value as JsonValue};
use std::io::Write;

use super::{Renderer, TreeGrid};
use crate::domain::RenderError;

/// One JSON object per row, keyed by column name
pub struct JsonLinesRenderer;

impl Renderer for JsonLinesRenderer {
    fn render(&self, grid: TreeGrid<'_>, out: &mut dyn Write) -> Result<usize, RenderError> {
        let names = grid.column_names();

        let mut count = 0;
        for row in grid.rows {
            let mut object = Map::with_capacity(names.len());
            for (name, value) in names.iter().zip(row) {
                object.insert((*name).to_string(), serde_json::to_value(value)?);
            }
            serde_json::to_writer(&mut *out, &JsonValue::Object(object))?;
            writeln!(out)?;
            count += 1;
        }
        out.flush()?;
        Ok(count)
    }
}

//! Task listing (`mac.pslist`)
//!
//! Shows the per-task metadata the argument scanner works from, without
//! touching process memory.

use super::{Plugin, Requirement};
use crate::config::Config;
use crate::context::Context;
use crate::domain::Architecture;
use crate::process::{PidFilter, ProcessRecord, TaskRecord};
use crate::render::{Column, ColumnType, Row, TreeGrid, Value};

const COLUMNS: [Column; 5] = [
    Column::new("PID", ColumnType::Int),
    Column::new("Process", ColumnType::Str),
    Column::new("Argc", ColumnType::Int),
    Column::new("ArgsLen", ColumnType::Int),
    Column::new("UserStack", ColumnType::Hex),
];

/// Lists the processes present in the capture
pub struct PsList;

impl Plugin for PsList {
    fn name(&self) -> &'static str {
        "mac.pslist"
    }

    fn description(&self) -> &'static str {
        "Lists the processes present in a particular mac memory image"
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
        TreeGrid::new(COLUMNS.to_vec(), tasks.map(|task| task_row(&task)))
    }
}

fn task_row(task: &TaskRecord) -> Row {
    vec![
        Value::from(task.pid.0),
        Value::Str(task.name()),
        Value::Int(task.argc),
        Value::Int(task.argslen),
        Value::Hex(task.user_stack),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_every_task() {
        let tasks = vec![
            TaskRecord::new(0, "kernel_task", 0, 0, 0),
            TaskRecord::new(1, "launchd", 0x7fff_5fc0_0000, 0x40, 1),
        ];
        let ctx =
            Context::new(tasks).with_layer("primary", Architecture::Intel64).with_symbol_table("darwin");

        let rows: Vec<Row> = PsList.run(&ctx, &Config::default()).rows.collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], Value::Str("launchd".to_string()));
        assert_eq!(rows[1][4], Value::Hex(0x7fff_5fc0_0000));
    }
}

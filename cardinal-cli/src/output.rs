use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Serialise `data` to stdout under `--json`, otherwise hand it to `render`.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    render: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if !opts.json {
        render(data);
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Column alignment for tabular output.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

impl From<Align> for CellAlignment {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => CellAlignment::Left,
            Align::Right => CellAlignment::Right,
        }
    }
}

/// Borderless table whose columns are separated by two spaces.
pub struct TabWriter {
    table: Table,
    prefix: String,
}

impl TabWriter {
    pub fn new(columns: Vec<(&str, Align)>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(columns.iter().map(|(header, _)| *header).collect::<Vec<_>>());

        let count = columns.len();
        for (index, column) in table.column_iter_mut().enumerate().take(count) {
            column.set_cell_alignment(columns[index].1.into());
            column.set_padding((u16::from(index > 0), u16::from(index + 1 < count)));
        }

        Self {
            table,
            prefix: String::new(),
        }
    }

    /// Prefix every printed line with `prefix`.
    pub fn indent(mut self, prefix: &str) -> Self {
        prefix.clone_into(&mut self.prefix);
        self
    }

    pub fn row(&mut self, values: Vec<String>) {
        self.table.add_row(values);
    }

    pub fn print(&self) {
        let rendered = self.table.to_string();
        for line in rendered.lines().map(str::trim_end) {
            println!("{}{line}", self.prefix);
        }
    }
}

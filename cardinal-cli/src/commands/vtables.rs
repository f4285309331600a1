use std::path::Path;

use cardinal::prelude::*;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_program, prepare, slot_name, Setup},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct RegionEntry {
    type_name: String,
    offset: u32,
    size: u32,
    slots: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VTableEntry {
    type_name: String,
    conversion_table_offset: u32,
    regions: Vec<RegionEntry>,
    conversions: Vec<(String, u32)>,
}

#[derive(Debug, Serialize)]
struct VTablesOutput {
    pointer_size: u32,
    vtables: Vec<VTableEntry>,
}

pub fn run(
    program: &Path,
    setup: &Setup,
    type_filter: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let metadata = load_program(program)?;
    let compiler = prepare(&metadata, setup)?;
    let compilation = compiler.compile()?;

    let tables: Vec<&VTable> = match type_filter {
        Some(name) => vec![compilation
            .vtable(name)
            .ok_or_else(|| anyhow::anyhow!("no vtable for type '{name}'"))?],
        None => compilation.vtables.iter().collect(),
    };

    let vtables = tables
        .into_iter()
        .map(|table| VTableEntry {
            type_name: table.type_name.clone(),
            conversion_table_offset: table.type_conversion_table_offset,
            regions: regions(compiler.resolver(), table),
            conversions: table.type_conversion_table.clone(),
        })
        .collect();

    let output = VTablesOutput {
        pointer_size: setup.pointer_size,
        vtables,
    };

    print_output(&output, opts, display)
}

/// Pair every region with the slots it holds, walking the table tree in layout order.
fn regions(resolver: &TypeResolver<'_>, table: &VTable) -> Vec<RegionEntry> {
    let mut nodes = Vec::new();
    let mut current = Some(table);
    while let Some(node) = current {
        nodes.push(node);
        current = node.base.as_deref();
    }
    nodes.extend(table.interfaces.iter());

    table
        .regions()
        .into_iter()
        .zip(nodes)
        .map(|(region, node)| RegionEntry {
            type_name: region.type_name,
            offset: region.offset,
            size: region.size,
            slots: node
                .members
                .iter()
                .map(|slot| slot_name(resolver, slot))
                .collect(),
        })
        .collect()
}

fn display(out: &VTablesOutput) {
    for table in &out.vtables {
        println!(
            "{} (conversion table at {:#x})",
            table.type_name, table.conversion_table_offset
        );

        let mut tw = TabWriter::new(vec![
            ("Offset", Align::Right),
            ("Region", Align::Left),
            ("Slot", Align::Left),
        ])
        .indent("  ");
        for region in &table.regions {
            tw.row(vec![
                format!("{:#x}", region.offset),
                region.type_name.clone(),
                "<parent offset>".to_string(),
            ]);
            for (index, slot) in region.slots.iter().enumerate() {
                let offset = region.offset + (index as u32 + 1) * out.pointer_size;
                tw.row(vec![format!("{offset:#x}"), String::new(), slot.clone()]);
            }
        }
        tw.print();

        for (name, offset) in &table.conversions {
            println!("  as {name} -> {offset:#x}");
        }
        println!();
    }
}

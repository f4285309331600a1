use std::path::Path;

use anyhow::Context;
use cardinal::prelude::*;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct TokenEntry {
    id: u32,
    offset: u32,
    operation: String,
    parameters: Vec<u32>,
    constants: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    string: Option<String>,
}

#[derive(Debug, Serialize)]
struct MethodEntry {
    name: String,
    is_static: bool,
    is_constructor: bool,
    max_stack: u32,
    token_count: usize,
    strings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tokens: Vec<TokenEntry>,
}

#[derive(Debug, Serialize)]
struct TypeEntry {
    name: String,
    is_static: bool,
    fields: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct NativeEntry {
    name: String,
    symbol: String,
}

#[derive(Debug, Serialize)]
struct DumpOutput {
    types: Vec<TypeEntry>,
    methods: Vec<MethodEntry>,
    natives: Vec<NativeEntry>,
}

pub fn run(
    image: &Path,
    method: Option<&str>,
    tokens: bool,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let records = ProgramReader::from_file(image)
        .with_context(|| format!("failed to read image: {}", image.display()))?;

    let methods = records
        .method_records
        .iter()
        .filter(|record| method.map_or(true, |filter| record.name.contains(filter)))
        .map(|record| MethodEntry {
            name: record.name.clone(),
            is_static: record.is_static,
            is_constructor: record.is_constructor,
            max_stack: record.max_stack,
            token_count: record.tokens.len(),
            strings: record.strings.clone(),
            tokens: if tokens {
                record.tokens.iter().map(token_entry).collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    let output = DumpOutput {
        types: records
            .type_records
            .iter()
            .map(|record| TypeEntry {
                name: record.name.clone(),
                is_static: record.is_static,
                fields: record.fields.clone(),
            })
            .collect(),
        methods,
        natives: records
            .native_methods
            .iter()
            .map(|(name, symbol)| NativeEntry {
                name: name.clone(),
                symbol: symbol.clone(),
            })
            .collect(),
    };

    print_output(&output, opts, display)
}

fn token_entry(token: &SsaToken) -> TokenEntry {
    TokenEntry {
        id: token.id,
        offset: token.offset,
        operation: token.operation.to_string(),
        parameters: token.parameters.clone(),
        constants: token.constants.clone(),
        string: token.string.clone(),
    }
}

fn display(out: &DumpOutput) {
    println!("Types ({}):", out.types.len());
    for ty in &out.types {
        let kind = if ty.is_static { "static" } else { "instance" };
        println!("  {} [{kind}]", ty.name);
        for (field_type, name) in &ty.fields {
            println!("    {field_type} {name}");
        }
    }

    println!("\nMethods ({}):", out.methods.len());
    let mut tw = TabWriter::new(vec![
        ("Name", Align::Left),
        ("Kind", Align::Left),
        ("Stack", Align::Right),
        ("Tokens", Align::Right),
        ("Strings", Align::Right),
    ])
    .indent("  ");
    for method in &out.methods {
        let kind = match (method.is_constructor, method.is_static) {
            (true, true) => "cctor",
            (true, false) => "ctor",
            (false, true) => "static",
            (false, false) => "instance",
        };
        tw.row(vec![
            method.name.clone(),
            kind.to_string(),
            method.max_stack.to_string(),
            method.token_count.to_string(),
            method.strings.len().to_string(),
        ]);
    }
    tw.print();

    for method in out.methods.iter().filter(|m| !m.tokens.is_empty()) {
        println!("\n{}:", method.name);
        let mut tw = TabWriter::new(vec![
            ("Id", Align::Right),
            ("Offset", Align::Left),
            ("Operation", Align::Left),
            ("Inputs", Align::Left),
            ("Constants", Align::Left),
            ("String", Align::Left),
        ])
        .indent("  ");
        for token in &method.tokens {
            tw.row(vec![
                format!("%{}", token.id),
                format!("IL_{:04x}", token.offset),
                token.operation.clone(),
                join(token.parameters.iter().map(|id| format!("%{id}"))),
                join(token.constants.iter().map(|value| format!("{value:#x}"))),
                token.string.clone().unwrap_or_default(),
            ]);
        }
        tw.print();
    }

    if !out.natives.is_empty() {
        println!("\nNatives ({}):", out.natives.len());
        for native in &out.natives {
            println!("  {} -> {}", native.name, native.symbol);
        }
    }
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

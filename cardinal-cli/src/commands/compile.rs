use std::path::Path;

use anyhow::Context;
use cardinal::prelude::*;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_program, prepare, Setup},
    output::print_output,
};

#[derive(Debug, Serialize)]
struct CompileOutput {
    output: String,
    methods: usize,
    types: usize,
    natives: usize,
    vtables: usize,
    bytes: usize,
}

pub fn run(
    program: &Path,
    setup: &Setup,
    output: &Path,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let metadata = load_program(program)?;
    let compiler = prepare(&metadata, setup)?;
    let compilation = compiler.compile()?;

    let writer = ProgramWriter::new(&compilation.records);
    writer
        .write_file(output)
        .with_context(|| format!("failed to write image: {}", output.display()))?;

    let summary = CompileOutput {
        output: output.display().to_string(),
        methods: compilation.records.method_records.len(),
        types: compilation.records.type_records.len(),
        natives: compilation.records.native_methods.len(),
        vtables: compilation.vtables.len(),
        bytes: writer.to_bytes().len(),
    };

    print_output(&summary, opts, |out| {
        println!(
            "Wrote {} ({} bytes): {} method(s), {} type record(s), {} native(s), {} vtable(s).",
            out.output, out.bytes, out.methods, out.types, out.natives, out.vtables
        );
    })
}

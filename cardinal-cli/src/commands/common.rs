use std::path::Path;

use anyhow::Context;
use cardinal::prelude::*;

/// Inputs shared by the commands that run a compilation.
pub struct Setup<'a> {
    pub entries: &'a [String],
    pub config: Option<&'a Path>,
    pub pointer_size: u32,
    pub dispatch_targets: bool,
}

/// Load a program description from disk.
pub fn load_program(path: &Path) -> anyhow::Result<ProgramMetadata> {
    ProgramMetadata::from_file(path)
        .with_context(|| format!("failed to load program: {}", path.display()))
}

/// Load the resolver configuration, or an empty one when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ResolverConfig> {
    match path {
        Some(path) => ResolverConfig::from_file(path)
            .with_context(|| format!("failed to load resolver config: {}", path.display())),
        None => Ok(ResolverConfig::new()),
    }
}

/// Build a compiler over `metadata` with every entry from `setup` registered.
pub fn prepare<'m>(metadata: &'m ProgramMetadata, setup: &Setup) -> anyhow::Result<Compiler<'m>> {
    let options = CompilerOptions::default()
        .with_pointer_size(setup.pointer_size)
        .with_dispatch_targets(setup.dispatch_targets);
    let mut compiler = Compiler::new(metadata, load_config(setup.config)?, options)?;

    for entry in setup.entries {
        add_entry(&mut compiler, entry).with_context(|| format!("invalid entry '{entry}'"))?;
    }
    Ok(compiler)
}

/// `Namespace.Type::Method` selects by name, anything else is read as a token.
fn add_entry(compiler: &mut Compiler<'_>, entry: &str) -> cardinal::Result<()> {
    match entry.split_once("::") {
        Some((type_name, method)) => compiler.add_entry_by_name(type_name, method),
        None => compiler.add_entry(Token::parse(entry)?),
    }
}

/// Mangled name of a vtable slot.
pub fn slot_name(resolver: &TypeResolver<'_>, slot: &Slot) -> String {
    NameMangler::mangle_callable(resolver.metadata(), &Callable::Method(slot.clone()))
        .unwrap_or_else(|_| slot.name.clone())
}

//! Whole-program compilation driver.
//!
//! A [`Compiler`] starts from one or more entry methods and computes their transitive closure:
//! every callable a translated body references is translated in turn, every type it touches
//! gets its type records and dispatch table. The closure runs on an explicit work-list, so
//! deep and mutually recursive call graphs neither grow the native stack nor loop.
//!
//! ```text
//!  entries ──► work-list ──► Translator ──► MethodRecord
//!                 ▲              │
//!                 │   Discovery  ├──► callables ──┘
//!                 │              ├──► types ──► TypeRecords + VTableCache
//!                 │              └──► natives ──► native map
//!                 └── dispatch targets of every cached vtable
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use cardinal::prelude::*;
//!
//! let metadata = ProgramMetadata::from_file("program.xml")?;
//! let mut compiler = Compiler::new(&metadata, ResolverConfig::new(), CompilerOptions::default())?;
//! compiler.add_entry_by_name("Demo.Program", "Main")?;
//!
//! let compilation = compiler.compile()?;
//! for table in &compilation.vtables {
//!     println!("{} ({} slots)", table.type_name, table.members.len());
//! }
//! # Ok::<(), cardinal::Error>(())
//! ```

mod session;

use crate::{
    metadata::{Callable, MetadataProvider, NameMangler, Token},
    program::Records,
    resolver::{ResolverConfig, TypeResolver},
    vtable::VTable,
    Result,
};

use session::Session;

/// Knobs of a compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Target pointer width in bytes, used for vtable offsets
    pub pointer_size: u32,
    /// Also compile every method reachable through a vtable slot of a touched type
    pub include_dispatch_targets: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            pointer_size: 8,
            include_dispatch_targets: true,
        }
    }
}

impl CompilerOptions {
    /// Sets the target pointer width.
    #[must_use]
    pub fn with_pointer_size(mut self, pointer_size: u32) -> Self {
        self.pointer_size = pointer_size;
        self
    }

    /// Enables or disables compiling vtable slot targets that no body calls directly.
    #[must_use]
    pub fn with_dispatch_targets(mut self, enabled: bool) -> Self {
        self.include_dispatch_targets = enabled;
        self
    }
}

/// Result of [`Compiler::compile`].
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Type records, method records and native bindings
    pub records: Records,
    /// Finalized dispatch tables, ordered by mangled type name
    pub vtables: Vec<VTable>,
}

impl Compilation {
    /// Dispatch table of the type with mangled name `type_name`.
    #[must_use]
    pub fn vtable(&self, type_name: &str) -> Option<&VTable> {
        self.vtables
            .binary_search_by(|table| table.type_name.as_str().cmp(type_name))
            .ok()
            .map(|index| &self.vtables[index])
    }
}

/// Computes the closure of a program from its entry methods.
pub struct Compiler<'m> {
    resolver: TypeResolver<'m>,
    options: CompilerOptions,
    entries: Vec<Callable>,
}

impl<'m> Compiler<'m> {
    /// Creates a compiler over `metadata`.
    ///
    /// # Errors
    /// [`crate::Error::Configuration`] if `config` names unknown types or methods, or if the
    /// pointer size is not 4 or 8.
    pub fn new(
        metadata: &'m dyn MetadataProvider,
        config: ResolverConfig,
        options: CompilerOptions,
    ) -> Result<Self> {
        if !matches!(options.pointer_size, 4 | 8) {
            return Err(config_error!(
                "Unsupported pointer size {}, expected 4 or 8",
                options.pointer_size
            ));
        }

        Ok(Compiler {
            resolver: TypeResolver::new(&config, metadata)?,
            options,
            entries: Vec::new(),
        })
    }

    /// The resolver built from the configuration.
    #[must_use]
    pub fn resolver(&self) -> &TypeResolver<'m> {
        &self.resolver
    }

    /// The options this compiler runs with.
    #[must_use]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Adds the method or constructor behind `token` as an entry point.
    ///
    /// # Errors
    /// [`crate::Error::MetadataNotFound`] if `token` names no callable.
    pub fn add_entry(&mut self, token: Token) -> Result<()> {
        let callable = self.resolver.metadata().callable(token)?;
        self.push_entry(callable);
        Ok(())
    }

    /// Adds the method called `method` on the type with full name `type_name`.
    ///
    /// `.ctor` and `.cctor` select the instance and static constructors.
    ///
    /// # Errors
    /// [`crate::Error::Configuration`] if the type does not exist, or if it has no member
    /// or more than one member with that name.
    pub fn add_entry_by_name(&mut self, type_name: &str, method: &str) -> Result<()> {
        let metadata = self.resolver.metadata();
        let ty = metadata
            .find_type(type_name)
            .ok_or_else(|| config_error!("Unknown entry type '{}'", type_name))?;

        let mut candidates: Vec<Callable> = metadata
            .declared_methods(&ty)?
            .into_iter()
            .filter(|m| m.name == method)
            .map(Callable::Method)
            .collect();
        candidates.extend(
            metadata
                .constructors(&ty)?
                .into_iter()
                .filter(|c| c.name() == method)
                .map(Callable::Constructor),
        );

        match candidates.len() {
            0 => Err(config_error!("Type '{}' has no method '{}'", type_name, method)),
            1 => {
                self.push_entry(candidates.remove(0));
                Ok(())
            }
            n => Err(config_error!(
                "Entry '{}::{}' is ambiguous ({} overloads), use a token instead",
                type_name,
                method,
                n
            )),
        }
    }

    fn push_entry(&mut self, callable: Callable) {
        if !self.entries.contains(&callable) {
            self.entries.push(callable);
        }
    }

    /// Entry points added so far.
    #[must_use]
    pub fn entries(&self) -> &[Callable] {
        &self.entries
    }

    /// Runs the closure.
    ///
    /// Every run starts from scratch, so compiling twice yields equal results.
    ///
    /// # Errors
    /// [`crate::Error::Configuration`] without entries; otherwise the first translation, layout
    /// or lookup failure aborts the run.
    pub fn compile(&self) -> Result<Compilation> {
        if self.entries.is_empty() {
            return Err(config_error!("No entry methods given"));
        }

        let mut session = Session::new(&self.resolver);
        for entry in &self.entries {
            log::debug!(
                "Entry {}",
                NameMangler::mangle_callable(self.resolver.metadata(), entry)?
            );
            session.reference(entry)?;
        }

        loop {
            session.drain()?;
            if !self.options.include_dispatch_targets || !session.schedule_dispatch_targets()? {
                break;
            }
        }

        let (records, vtables) = session.finish(self.options.pointer_size);
        log::info!(
            "Compiled {} methods, {} type records, {} native bindings, {} vtables",
            records.method_records.len(),
            records.type_records.len(),
            records.native_methods.len(),
            vtables.len()
        );

        Ok(Compilation { records, vtables })
    }
}

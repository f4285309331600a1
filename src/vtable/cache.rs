//! Memoized vtable builders and type records.

use std::collections::{HashMap, HashSet};

use crate::{
    metadata::{NameMangler, Token},
    program::TypeRecord,
    resolver::TypeResolver,
    vtable::{builder::VTableBuilder, table::VTable},
    Error, Result,
};

/// Instance and static field layouts of every type the cache has seen.
#[derive(Debug, Default, Clone)]
pub struct TypeCache {
    instance: HashMap<Token, TypeRecord>,
    statics: HashMap<Token, TypeRecord>,
}

impl TypeCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds both records of `ty` and then those of its base chain.
    ///
    /// Records are named after `ty` itself; the fields come from its substitute, split by
    /// static-ness and kept in declaration order.
    ///
    /// # Errors
    /// Propagates lookup failures.
    pub fn add(&mut self, ty: Token, resolver: &TypeResolver<'_>) -> Result<()> {
        let metadata = resolver.metadata();
        let mut current = Some(ty);

        while let Some(token) = current {
            if self.instance.contains_key(&token) {
                break;
            }

            let def = metadata.type_def(token)?;
            let resolved = metadata.type_def(resolver.resolve_type(token))?;

            let mut instance = TypeRecord::new(NameMangler::mangle_type(&def, false), false);
            let mut statics = TypeRecord::new(NameMangler::mangle_type(&def, true), true);
            for field in metadata.declared_fields(&resolved)? {
                let field_type = NameMangler::type_name(metadata, field.field_type, false)?;
                if field.is_static {
                    statics.add_field(field_type, field.name.clone());
                } else {
                    instance.add_field(field_type, field.name.clone());
                }
            }

            self.instance.insert(token, instance);
            self.statics.insert(token, statics);
            current = def.base;
        }

        Ok(())
    }

    /// Record of `ty`'s instance or static fields.
    #[must_use]
    pub fn get(&self, ty: Token, is_static: bool) -> Option<&TypeRecord> {
        if is_static {
            self.statics.get(&ty)
        } else {
            self.instance.get(&ty)
        }
    }

    /// `true` if `ty` has been added.
    #[must_use]
    pub fn contains(&self, ty: Token) -> bool {
        self.instance.contains_key(&ty)
    }
}

/// One [`VTableBuilder`] per type, built on first use.
///
/// Array types are keyed by their element type. Every table handed out is an independent
/// copy, so finalizing one type's layout never disturbs another's.
pub struct VTableCache<'r, 'm> {
    resolver: &'r TypeResolver<'m>,
    builders: HashMap<Token, VTableBuilder>,
    order: Vec<Token>,
    in_progress: HashSet<Token>,
    types: TypeCache,
}

impl<'r, 'm> VTableCache<'r, 'm> {
    /// Creates an empty cache over `resolver`.
    #[must_use]
    pub fn new(resolver: &'r TypeResolver<'m>) -> Self {
        VTableCache {
            resolver,
            builders: HashMap::new(),
            order: Vec::new(),
            in_progress: HashSet::new(),
            types: TypeCache::new(),
        }
    }

    /// The resolver builders classify against.
    #[must_use]
    pub fn resolver(&self) -> &'r TypeResolver<'m> {
        self.resolver
    }

    /// Strips array wrappers from `ty`.
    ///
    /// # Errors
    /// Propagates lookup failures.
    pub fn canonical(&self, ty: Token) -> Result<Token> {
        let metadata = self.resolver.metadata();
        let mut current = ty;
        while let Some(element) = metadata.type_def(current)?.element {
            current = element;
        }
        Ok(current)
    }

    /// Builds and memoizes the builder of `ty` (and transitively its bases and interfaces).
    ///
    /// # Errors
    /// [`Error::Configuration`] for cyclic inheritance, plus everything
    /// [`VTableBuilder`] classification raises.
    pub fn add(&mut self, ty: Token) -> Result<()> {
        let ty = self.canonical(ty)?;
        if self.builders.contains_key(&ty) {
            return Ok(());
        }
        if !self.in_progress.insert(ty) {
            return Err(Error::Configuration(format!(
                "type {} inherits from itself",
                self.resolver.metadata().type_name(ty)?
            )));
        }

        let built = VTableBuilder::build(ty, self);
        self.in_progress.remove(&ty);
        let builder = built?;

        self.types.add(ty, self.resolver)?;
        log::debug!("vtable builder for {}", builder.type_def().full_name());
        self.builders.insert(ty, builder);
        self.order.push(ty);
        Ok(())
    }

    /// A fresh, unfinalized table for `ty`, adding it first if needed.
    ///
    /// # Errors
    /// Same as [`VTableCache::add`].
    pub fn get(&mut self, ty: Token) -> Result<VTable> {
        self.add(ty)?;
        let ty = self.canonical(ty)?;
        self.builders
            .get(&ty)
            .map(VTableBuilder::emit)
            .ok_or(Error::MetadataNotFound(ty))
    }

    /// The memoized builder of `ty`, if it has been added.
    #[must_use]
    pub fn builder(&self, ty: Token) -> Option<&VTableBuilder> {
        self.builders.get(&ty)
    }

    /// Types in the order their builders completed.
    pub fn types(&self) -> impl Iterator<Item = Token> + '_ {
        self.order.iter().copied()
    }

    /// Number of memoized builders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// `true` if nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Field layouts of every added type.
    #[must_use]
    pub fn type_cache(&self) -> &TypeCache {
        &self.types
    }

    /// Mutable access for recording types that need no dispatch table.
    pub fn type_cache_mut(&mut self) -> &mut TypeCache {
        &mut self.types
    }

    /// Finalized tables of all added types, ordered by mangled type name.
    ///
    /// Each table is emitted fresh, gets its offsets assigned and then its type conversion
    /// table built.
    #[must_use]
    pub fn compile(&self, pointer_size: u32) -> Vec<VTable> {
        let mut tables: Vec<VTable> = self
            .order
            .iter()
            .filter_map(|ty| self.builders.get(ty))
            .map(|builder| {
                let mut table = builder.emit();
                table.update_offsets(pointer_size);
                table.build_type_conversion_table();
                table
            })
            .collect();

        tables.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        tables
    }
}

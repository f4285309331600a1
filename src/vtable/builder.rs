//! Per-type method classification.

use std::sync::Arc;

use crate::{
    metadata::{MethodDef, Token, TypeDef},
    vtable::{cache::VTableCache, table::VTable, table::Slot},
    Result,
};

/// Classified methods of one type, plus the base and interface tables they patch.
///
/// Built once per type by [`VTableCache`]; [`VTableBuilder::emit`] materializes a fresh,
/// independent [`VTable`] from it as often as needed.
#[derive(Debug, Clone)]
pub struct VTableBuilder {
    ty: Arc<TypeDef>,
    resolved: Token,
    virtual_methods: Vec<Slot>,
    abstract_methods: Vec<Slot>,
    non_virtual_methods: Vec<Arc<MethodDef>>,
    base: Option<VTable>,
    interfaces: Vec<VTable>,
}

impl VTableBuilder {
    /// Classifies the instance methods of `ty`.
    ///
    /// Base class and interface tables are fetched from (and if needed added to) `cache`.
    /// In priority order, each method of the substituted type becomes:
    ///
    /// 1. an abstract slot if it is abstract
    /// 2. an override if it is virtual, declared on this type and not its own root
    ///    declaration. The overridden slot in the base table is replaced, and unless the
    ///    override is final it also gets a virtual slot here.
    /// 3. a virtual slot if it is virtual and not final
    /// 4. a non-virtual method if declared on this type
    ///
    /// Anything else is inherited and needs no entry.
    ///
    /// # Errors
    /// [`crate::Error::UnresolvedOverride`] for an override without base slot or an interface
    /// method without implementation, plus lookup failures.
    pub(crate) fn build(ty: Token, cache: &mut VTableCache<'_, '_>) -> Result<Self> {
        let resolver = cache.resolver();
        let metadata = resolver.metadata();

        let ty = metadata.type_def(ty)?;
        let resolved = resolver.resolve_type(ty.token);
        let resolved_def = metadata.type_def(resolved)?;

        let base = match ty.base {
            Some(base) => Some(cache.get(base)?),
            None => None,
        };

        let mut builder = VTableBuilder {
            ty,
            resolved,
            virtual_methods: Vec::new(),
            abstract_methods: Vec::new(),
            non_virtual_methods: Vec::new(),
            base,
            interfaces: Vec::new(),
        };

        for iface in metadata.interfaces(&resolved_def)? {
            let mut table = cache.get(iface)?;
            if !resolved_def.is_interface() {
                for (declared, target) in metadata.interface_map(&resolved_def, iface)? {
                    table.update_interface_method(&declared, &target);
                }
            }
            builder.interfaces.push(table);
        }

        for method in metadata.instance_methods(&resolved_def)? {
            let root = metadata.base_definition(&method)?;
            let declared_here = method.declaring == resolved;

            if method.is_abstract() {
                builder.abstract_methods.push(method);
            } else if declared_here && method.is_virtual() && root.token != method.token {
                if let Some(base) = builder.base.as_mut() {
                    base.update_method(&method, resolver, true)?;
                }
                if method.is_final() {
                    builder.non_virtual_methods.push(method);
                } else {
                    builder.virtual_methods.push(method);
                }
            } else if method.is_virtual() && !method.is_final() {
                builder.virtual_methods.push(method);
            } else if declared_here {
                builder.non_virtual_methods.push(method);
            } else {
                log::debug!(
                    "{}: ignoring inherited method {}.{}",
                    builder.ty.full_name(),
                    metadata.type_name(method.declaring)?,
                    method.name
                );
            }
        }

        log::trace!(
            "{}: {} virtual, {} abstract, {} non-virtual, {} interfaces",
            builder.ty.full_name(),
            builder.virtual_methods.len(),
            builder.abstract_methods.len(),
            builder.non_virtual_methods.len(),
            builder.interfaces.len()
        );

        Ok(builder)
    }

    /// Materializes an independent table: virtual slots then abstract slots, with copies of
    /// the patched base and interface tables. Offsets are left at zero.
    #[must_use]
    pub fn emit(&self) -> VTable {
        let members = self
            .virtual_methods
            .iter()
            .chain(&self.abstract_methods)
            .cloned()
            .collect();

        VTable::new(
            &self.ty,
            self.resolved,
            members,
            self.base.clone(),
            self.interfaces.clone(),
        )
    }

    /// The type this builder describes.
    #[must_use]
    pub fn type_def(&self) -> &Arc<TypeDef> {
        &self.ty
    }

    /// Methods that occupy a virtual slot at this level.
    #[must_use]
    pub fn virtual_methods(&self) -> &[Slot] {
        &self.virtual_methods
    }

    /// Abstract methods declared or inherited without implementation.
    #[must_use]
    pub fn abstract_methods(&self) -> &[Slot] {
        &self.abstract_methods
    }

    /// Methods declared here that are dispatched statically.
    #[must_use]
    pub fn non_virtual_methods(&self) -> &[Arc<MethodDef>] {
        &self.non_virtual_methods
    }
}

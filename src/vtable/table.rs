//! The dispatch table tree of one type.

use std::sync::Arc;

use crate::{
    metadata::{MethodDef, NameMangler, Token, TypeDef},
    resolver::TypeResolver,
    Error, Result,
};

/// One dispatch slot: the method a call through the slot lands on.
pub type Slot = Arc<MethodDef>;

/// Placement of one node's slots within the finalized table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRegion {
    /// Mangled name of the node's type
    pub type_name: String,
    /// First byte of the region
    pub offset: u32,
    /// Region size: one header pointer plus one pointer per slot
    pub size: u32,
}

impl SlotRegion {
    /// One past the last byte of the region.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// Virtual dispatch table of a type.
///
/// The table owns copies of its base class and interface tables, so offsets and slot
/// overwrites are local to the type that owns the tree. [`Clone`] produces an independent
/// tree; only the immutable method definitions are shared.
///
/// A freshly emitted table has all offsets at zero. [`VTable::update_offsets`] and then
/// [`VTable::build_type_conversion_table`] finalize it.
#[derive(Debug, Clone)]
pub struct VTable {
    /// Start of this node's slot region, relative to the most derived type's table
    pub parent_offset: u32,
    /// Position of the type conversion table, after every slot region of the tree
    pub type_conversion_table_offset: u32,
    /// Type this node describes
    pub current_type: Token,
    /// `current_type` after substitution
    pub resolved_type: Token,
    /// Mangled name of `current_type`
    pub type_name: String,
    /// Virtual slots followed by abstract slots
    pub members: Vec<Slot>,
    /// Table of the base class
    pub base: Option<Box<VTable>>,
    /// Tables of implemented interfaces; only populated at the root after offset assignment
    pub interfaces: Vec<VTable>,
    /// Mangled type name -> offset of that type's region, self first
    pub type_conversion_table: Vec<(String, u32)>,
    region_size: u32,
}

impl VTable {
    /// Creates a table with zeroed offsets.
    #[must_use]
    pub fn new(
        ty: &TypeDef,
        resolved_type: Token,
        members: Vec<Slot>,
        base: Option<VTable>,
        interfaces: Vec<VTable>,
    ) -> Self {
        VTable {
            parent_offset: 0,
            type_conversion_table_offset: 0,
            current_type: ty.token,
            resolved_type,
            type_name: NameMangler::mangle_type(ty, false),
            members,
            base: base.map(Box::new),
            interfaces,
            type_conversion_table: Vec::new(),
            region_size: 0,
        }
    }

    /// Replaces the slot that `method` overrides, here or further up the base chain.
    ///
    /// A slot matches when it descends from the same root declaration (compared after type
    /// substitution) and has the same name, return type and parameters, including parameter
    /// direction flags. The first match in each node is replaced; the walk continues into the
    /// base table until it reaches the node that declared the root.
    ///
    /// # Errors
    /// [`Error::UnresolvedOverride`] if `expect_match` is set and no slot was replaced.
    pub fn update_method(
        &mut self,
        method: &Arc<MethodDef>,
        resolver: &TypeResolver<'_>,
        expect_match: bool,
    ) -> Result<()> {
        let metadata = resolver.metadata();
        let root = resolver.resolve_type(metadata.base_definition(method)?.declaring);

        if !self.update_method_internal(method, root, resolver)? && expect_match {
            return Err(Error::UnresolvedOverride {
                ty: metadata
                    .type_name(method.declaring)
                    .unwrap_or_else(|_| method.declaring.to_string()),
                method: method.name.clone(),
            });
        }
        Ok(())
    }

    fn update_method_internal(
        &mut self,
        method: &Arc<MethodDef>,
        root: Token,
        resolver: &TypeResolver<'_>,
    ) -> Result<bool> {
        let metadata = resolver.metadata();
        let mut updated = false;

        for slot in &mut self.members {
            let slot_root = resolver.resolve_type(metadata.base_definition(slot)?.declaring);
            if slot_root == root && slot.same_signature(method) {
                *slot = Arc::clone(method);
                updated = true;
                break;
            }
        }

        if root != self.resolved_type {
            if let Some(base) = self.base.as_mut() {
                if base.update_method_internal(method, root, resolver)? {
                    updated = true;
                }
            }
        }

        Ok(updated)
    }

    /// Replaces the slot holding exactly `target` with `replacement`.
    pub fn update_interface_method(&mut self, target: &MethodDef, replacement: &Arc<MethodDef>) {
        if let Some(slot) = self.members.iter_mut().find(|slot| slot.token == target.token) {
            *slot = Arc::clone(replacement);
        }
    }

    /// Assigns slot region offsets to the whole tree, starting at this table's
    /// `parent_offset`.
    ///
    /// Regions are laid out as self, then the base chain, then (at the root only) each
    /// interface. Interface tables below the root are dropped.
    pub fn update_offsets(&mut self, pointer_size: u32) {
        self.update_offsets_internal(true, pointer_size);
    }

    fn update_offsets_internal(&mut self, is_top: bool, pointer_size: u32) -> u32 {
        self.region_size = (self.members.len() as u32 + 1) * pointer_size;
        let mut offset = self.parent_offset + self.region_size;

        if let Some(base) = self.base.as_mut() {
            base.parent_offset = offset;
            offset = base.update_offsets_internal(false, pointer_size);
        }

        if is_top {
            for iface in &mut self.interfaces {
                iface.parent_offset = offset;
                offset = iface.update_offsets_internal(false, pointer_size);
            }
        } else {
            self.interfaces.clear();
        }

        self.type_conversion_table_offset = offset;
        offset
    }

    /// Collects `type name -> region offset` for self, the base chain and the interfaces.
    /// The first entry recorded for a name wins.
    pub fn build_type_conversion_table(&mut self) {
        let mut table = Vec::new();
        self.collect_subtables(&mut table);
        self.type_conversion_table = table;
    }

    fn collect_subtables(&self, table: &mut Vec<(String, u32)>) {
        insert_first(table, &self.type_name, self.parent_offset);

        if let Some(base) = &self.base {
            base.collect_subtables(table);
        }
        for iface in &self.interfaces {
            insert_first(table, &iface.type_name, iface.parent_offset);
        }
    }

    /// Offset recorded for `type_name` in the conversion table.
    #[must_use]
    pub fn conversion_offset(&self, type_name: &str) -> Option<u32> {
        self.type_conversion_table
            .iter()
            .find(|(name, _)| name == type_name)
            .map(|(_, offset)| *offset)
    }

    /// Slot regions of the finalized tree in layout order.
    #[must_use]
    pub fn regions(&self) -> Vec<SlotRegion> {
        let mut regions = Vec::new();
        self.collect_regions(&mut regions);
        regions
    }

    fn collect_regions(&self, regions: &mut Vec<SlotRegion>) {
        regions.push(SlotRegion {
            type_name: self.type_name.clone(),
            offset: self.parent_offset,
            size: self.region_size,
        });
        if let Some(base) = &self.base {
            base.collect_regions(regions);
        }
        for iface in &self.interfaces {
            iface.collect_regions(regions);
        }
    }

    /// Depth of the base chain, this table included.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.base.as_ref().map_or(0, |base| base.depth())
    }
}

fn insert_first(table: &mut Vec<(String, u32)>, name: &str, offset: u32) {
    if !table.iter().any(|(existing, _)| existing == name) {
        table.push((name.to_string(), offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MethodAccessFlags, MethodModifiers, MethodVtableFlags, TypeFlags};

    fn type_def(token: u32, name: &str) -> TypeDef {
        TypeDef {
            token: Token(token),
            namespace: "Demo".into(),
            name: name.into(),
            flags: TypeFlags::PUBLIC,
            base: None,
            element: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    fn method(token: u32, name: &str) -> Arc<MethodDef> {
        Arc::new(MethodDef {
            token: Token(token),
            name: name.into(),
            declaring: Token(0x0200_0001),
            access: MethodAccessFlags::PUBLIC,
            modifiers: MethodModifiers::VIRTUAL,
            vtable_layout: MethodVtableFlags::NEW_SLOT,
            returns: None,
            params: Vec::new(),
            body: None,
        })
    }

    fn table(token: u32, name: &str, slots: usize) -> VTable {
        let members = (0..slots)
            .map(|i| method(0x0600_0000 + token * 16 + i as u32, "M"))
            .collect();
        VTable::new(&type_def(token, name), Token(token), members, None, Vec::new())
    }

    #[test]
    fn offsets_chain_base_then_interfaces() {
        let mut root = table(1, "Root", 2);
        let mut middle = table(2, "Middle", 1);
        middle.base = Some(Box::new(table(3, "Top", 0)));
        middle.interfaces.push(table(4, "INested", 1));
        root.base = Some(Box::new(middle));
        root.interfaces.push(table(5, "IFirst", 3));

        root.update_offsets(8);
        root.build_type_conversion_table();

        // Root 3*8, Middle 2*8, Top 1*8, IFirst 4*8
        let regions = root.regions();
        let layout: Vec<(&str, u32, u32)> = regions
            .iter()
            .map(|r| (r.type_name.as_str(), r.offset, r.size))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("Demo.Root", 0, 24),
                ("Demo.Middle", 24, 16),
                ("Demo.Top", 40, 8),
                ("Demo.IFirst", 48, 32),
            ]
        );
        assert_eq!(root.type_conversion_table_offset, 80);
        assert!(root.base.as_ref().unwrap().interfaces.is_empty());

        assert_eq!(root.conversion_offset("Demo.Root"), Some(0));
        assert_eq!(root.conversion_offset("Demo.Top"), Some(40));
        assert_eq!(root.conversion_offset("Demo.IFirst"), Some(48));
        assert_eq!(root.conversion_offset("Demo.INested"), None);
    }

    #[test]
    fn conversion_table_first_writer_wins() {
        let mut root = table(1, "Root", 0);
        root.interfaces.push(table(2, "IShared", 1));
        root.interfaces.push(table(2, "IShared", 2));

        root.update_offsets(4);
        root.build_type_conversion_table();

        assert_eq!(root.type_conversion_table.len(), 2);
        assert_eq!(root.conversion_offset("Demo.IShared"), Some(4));
    }

    #[test]
    fn clones_are_independent() {
        let mut original = table(1, "Root", 1);
        original.base = Some(Box::new(table(2, "Base", 1)));

        let mut copy = original.clone();
        copy.update_offsets(8);
        copy.base.as_mut().unwrap().members.clear();

        assert_eq!(original.base.as_ref().unwrap().parent_offset, 0);
        assert_eq!(original.base.as_ref().unwrap().members.len(), 1);
        assert_eq!(copy.base.as_ref().unwrap().parent_offset, 16);
    }

    #[test]
    fn interface_slot_replaced_by_identity() {
        let mut iface = table(1, "IRunner", 2);
        let target = Arc::clone(&iface.members[1]);
        let replacement = method(0x0600_0100, "Run");

        iface.update_interface_method(&target, &replacement);
        assert_eq!(iface.members[0].token, Token(0x0600_0010));
        assert_eq!(iface.members[1].token, Token(0x0600_0100));
    }
}

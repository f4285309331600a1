//! The state of one closure run.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    metadata::{Callable, NameMangler, Token},
    program::{MethodRecord, Records},
    resolver::TypeResolver,
    translate::{Discovery, Translator},
    vtable::{Slot, VTable, VTableCache},
    Error, Result,
};

/// Work-list, visited sets and output of a [`super::Compiler::compile`] call.
pub(super) struct Session<'r, 'm> {
    resolver: &'r TypeResolver<'m>,
    records: Records,
    vtables: VTableCache<'r, 'm>,
    pending: VecDeque<Callable>,
    /// Mangled callable name -> token that claimed it
    callables: HashMap<String, Token>,
    /// Mangled type name -> token that claimed it
    type_names: HashMap<String, Token>,
    full_types: HashSet<Token>,
    static_types: HashSet<Token>,
    dispatched: HashSet<Token>,
}

impl<'r, 'm> Session<'r, 'm> {
    pub(super) fn new(resolver: &'r TypeResolver<'m>) -> Self {
        Session {
            resolver,
            records: Records::new(),
            vtables: VTableCache::new(resolver),
            pending: VecDeque::new(),
            callables: HashMap::new(),
            type_names: HashMap::new(),
            full_types: HashSet::new(),
            static_types: HashSet::new(),
            dispatched: HashSet::new(),
        }
    }

    /// Resolves `callable` and either binds it natively or schedules it.
    pub(super) fn reference(&mut self, callable: &Callable) -> Result<()> {
        let resolved = self.resolver.resolve_callable(callable)?;
        match self.resolver.native_name(&resolved)? {
            Some(symbol) => {
                let name = NameMangler::mangle_callable(self.resolver.metadata(), &resolved)?;
                self.register_native(name, symbol);
                Ok(())
            }
            None => self.request_callable(&resolved),
        }
    }

    /// Translates scheduled callables until the work-list is empty.
    pub(super) fn drain(&mut self) -> Result<()> {
        while let Some(callable) = self.pending.pop_front() {
            self.translate(&callable)?;
        }
        Ok(())
    }

    /// Schedules the implementation behind every slot of every table not visited yet.
    ///
    /// Returns `true` if that left new work on the list.
    pub(super) fn schedule_dispatch_targets(&mut self) -> Result<bool> {
        loop {
            let fresh: Vec<Token> = self
                .vtables
                .types()
                .filter(|ty| !self.dispatched.contains(ty))
                .collect();
            if fresh.is_empty() {
                break;
            }

            for ty in fresh {
                self.dispatched.insert(ty);
                let mut slots = Vec::new();
                collect_slots(&self.vtables.get(ty)?, &mut slots);

                for slot in slots.into_iter().filter(|slot| !slot.is_abstract()) {
                    self.reference_dispatch_target(Callable::Method(slot))?;
                }
            }
        }

        Ok(!self.pending.is_empty())
    }

    /// Like [`Self::reference`], but a slot without a body is implemented by the runtime and
    /// is skipped instead of failing the run.
    fn reference_dispatch_target(&mut self, slot: Callable) -> Result<()> {
        let resolved = self.resolver.resolve_callable(&slot)?;
        if resolved.body().is_none() && self.resolver.native_name(&resolved)?.is_none() {
            log::debug!(
                "Skipping dispatch target {} without a body",
                NameMangler::mangle_callable(self.resolver.metadata(), &resolved)?
            );
            return Ok(());
        }
        self.reference(&slot)
    }

    /// Finalizes the vtables and hands out the results.
    pub(super) fn finish(self, pointer_size: u32) -> (Records, Vec<VTable>) {
        let vtables = self.vtables.compile(pointer_size);
        (self.records, vtables)
    }

    fn translate(&mut self, callable: &Callable) -> Result<()> {
        let name = NameMangler::mangle_callable(self.resolver.metadata(), callable)?;
        let body = callable
            .body()
            .ok_or_else(|| Error::MissingMethodBody(name.clone()))?;

        log::debug!("Translating {name}");
        let translation = Translator::new(self.resolver, name.clone()).translate(&body.code, self)?;

        self.records.add_method(MethodRecord {
            name,
            is_static: callable.is_static(),
            is_constructor: callable.is_constructor(),
            init_locals: body.init_locals,
            max_stack: body.max_stack,
            strings: translation.strings,
            tokens: translation.tokens,
        });
        Ok(())
    }

    fn claim_type(&mut self, ty: Token) -> Result<()> {
        let name = NameMangler::type_name(self.resolver.metadata(), ty, false)?;
        match self.type_names.get(&name) {
            Some(owner) if *owner != ty => Err(Error::DuplicateDefinition { name }),
            Some(_) => Ok(()),
            None => {
                self.type_names.insert(name, ty);
                Ok(())
            }
        }
    }

    fn push_record(&mut self, ty: Token, is_static: bool) -> Result<()> {
        let record = self
            .vtables
            .type_cache()
            .get(ty, is_static)
            .cloned()
            .ok_or(Error::MetadataNotFound(ty))?;
        if self.records.add_type(record) {
            log::trace!("Type record {ty} (static: {is_static})");
        }
        Ok(())
    }

    /// Discovers `ty` and everything its layout depends on: both records, its dispatch
    /// table, its base class, its interfaces and the types of its fields.
    fn discover_type(&mut self, ty: Token) -> Result<()> {
        let metadata = self.resolver.metadata();
        let mut stack = vec![ty];

        while let Some(ty) = stack.pop() {
            let ty = self.vtables.canonical(ty)?;
            if !self.full_types.insert(ty) {
                continue;
            }

            self.claim_type(ty)?;
            self.vtables.add(ty)?;
            self.push_record(ty, true)?;
            self.push_record(ty, false)?;

            let declared = metadata.type_def(ty)?;
            let resolved = metadata.type_def(self.resolver.resolve_type(ty))?;
            log::debug!("Discovered type {}", declared.full_name());

            let mut next: Vec<Token> = declared.base.into_iter().collect();
            next.extend(resolved.interfaces.iter().copied());
            next.extend(
                metadata
                    .declared_fields(&resolved)?
                    .iter()
                    .map(|field| field.field_type),
            );
            stack.extend(next.into_iter().rev());
        }
        Ok(())
    }

    /// Discovers only the static part of `ty`: its static record and the types of its static
    /// fields.
    fn discover_statics(&mut self, ty: Token) -> Result<()> {
        let metadata = self.resolver.metadata();
        let ty = self.vtables.canonical(ty)?;
        if self.full_types.contains(&ty) || !self.static_types.insert(ty) {
            return Ok(());
        }

        self.claim_type(ty)?;
        self.vtables.type_cache_mut().add(ty, self.resolver)?;
        self.push_record(ty, true)?;

        let resolved = metadata.type_def(self.resolver.resolve_type(ty))?;
        for field in metadata.declared_fields(&resolved)? {
            if field.is_static {
                self.discover_type(field.field_type)?;
            }
        }
        Ok(())
    }
}

impl Discovery for Session<'_, '_> {
    fn request_callable(&mut self, callable: &Callable) -> Result<()> {
        let name = NameMangler::mangle_callable(self.resolver.metadata(), callable)?;
        match self.callables.get(&name) {
            Some(owner) if *owner == callable.token() => return Ok(()),
            Some(_) => return Err(Error::DuplicateDefinition { name }),
            None => {}
        }
        self.callables.insert(name.clone(), callable.token());

        let declaring = callable.declaring();
        if callable.is_static() {
            self.discover_statics(declaring)?;
        } else {
            self.discover_type(declaring)?;
        }
        for param in callable.params() {
            self.discover_type(param.param_type)?;
        }
        if let Some(returns) = callable.returns() {
            self.discover_type(returns)?;
        }

        if matches!(callable, Callable::Method(method) if method.is_abstract()) {
            log::debug!("{name} is abstract, reachable through dispatch only");
            return Ok(());
        }

        log::trace!("Scheduled {name}");
        self.pending.push_back(callable.clone());
        Ok(())
    }

    fn request_type(&mut self, ty: Token) -> Result<()> {
        self.discover_type(ty)
    }

    fn register_native(&mut self, name: String, symbol: String) {
        if !self.records.native_methods.contains_key(&name) {
            log::debug!("Native binding {name} -> {symbol}");
            self.records.native_methods.insert(name, symbol);
        }
    }
}

fn collect_slots(table: &VTable, slots: &mut Vec<Slot>) {
    slots.extend(table.members.iter().cloned());
    if let Some(base) = &table.base {
        collect_slots(base, slots);
    }
    for iface in &table.interfaces {
        collect_slots(iface, slots);
    }
}

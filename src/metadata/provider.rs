//! The reflective view of an input program.
//!
//! [`MetadataProvider`] is the seam between the compiler and whatever supplies the program:
//! the in-memory [`crate::metadata::ProgramMetadata`] in this crate, or an adapter over a real
//! assembly reader. Implementors supply token lookups; the derived reflective queries the
//! vtable builder needs (root declarations, visible instance methods, transitive interfaces,
//! interface maps) come as provided methods built on top of them.

use std::{collections::HashSet, sync::Arc};

use crate::{
    metadata::{
        defs::{Callable, ConstructorDef, FieldDef, MethodDef, TypeDef},
        token::Token,
    },
    Error, Result,
};

/// Source of type, member and constant pool information.
pub trait MetadataProvider {
    /// Looks up a type definition.
    ///
    /// # Errors
    /// [`Error::MetadataNotFound`] if `token` names no type.
    fn type_def(&self, token: Token) -> Result<Arc<TypeDef>>;

    /// Looks up a field definition.
    ///
    /// # Errors
    /// [`Error::MetadataNotFound`] if `token` names no field.
    fn field(&self, token: Token) -> Result<Arc<FieldDef>>;

    /// Resolves a method or constructor reference.
    ///
    /// # Errors
    /// [`Error::MetadataNotFound`] if `token` names no callable.
    fn callable(&self, token: Token) -> Result<Callable>;

    /// Resolves a string literal token.
    ///
    /// # Errors
    /// [`Error::MetadataNotFound`] if `token` names no literal.
    fn user_string(&self, token: Token) -> Result<String>;

    /// Finds a type by its full name (`Namespace.Name`).
    fn find_type(&self, full_name: &str) -> Option<Arc<TypeDef>>;

    /// Resolves `token` to a method, rejecting constructors.
    ///
    /// # Errors
    /// [`Error::InvalidToken`] if `token` names a constructor.
    fn method(&self, token: Token) -> Result<Arc<MethodDef>> {
        match self.callable(token)? {
            Callable::Method(method) => Ok(method),
            Callable::Constructor(_) => Err(Error::InvalidToken {
                token,
                expected: "method",
            }),
        }
    }

    /// Resolves `token` to a constructor, rejecting methods.
    ///
    /// # Errors
    /// [`Error::InvalidToken`] if `token` names a method.
    fn constructor(&self, token: Token) -> Result<Arc<ConstructorDef>> {
        match self.callable(token)? {
            Callable::Constructor(ctor) => Ok(ctor),
            Callable::Method(_) => Err(Error::InvalidToken {
                token,
                expected: "constructor",
            }),
        }
    }

    /// Full name of the type behind `token`.
    ///
    /// # Errors
    /// Propagates lookup failures.
    fn type_name(&self, token: Token) -> Result<String> {
        Ok(self.type_def(token)?.full_name())
    }

    /// Methods declared directly on `ty`.
    ///
    /// # Errors
    /// Propagates lookup failures.
    fn declared_methods(&self, ty: &TypeDef) -> Result<Vec<Arc<MethodDef>>> {
        ty.methods.iter().map(|token| self.method(*token)).collect()
    }

    /// Fields declared directly on `ty`.
    ///
    /// # Errors
    /// Propagates lookup failures.
    fn declared_fields(&self, ty: &TypeDef) -> Result<Vec<Arc<FieldDef>>> {
        ty.fields.iter().map(|token| self.field(*token)).collect()
    }

    /// Constructors declared on `ty`.
    ///
    /// # Errors
    /// Propagates lookup failures.
    fn constructors(&self, ty: &TypeDef) -> Result<Vec<Arc<ConstructorDef>>> {
        ty.constructors
            .iter()
            .map(|token| self.constructor(*token))
            .collect()
    }

    /// Returns the method that first declared the vtable slot `method` occupies.
    ///
    /// Non-virtual and `newslot` methods are their own root. Otherwise the base chain is
    /// searched, nearest first, for a virtual method with the same signature, and the search
    /// continues from there.
    ///
    /// # Errors
    /// Propagates lookup failures.
    fn base_definition(&self, method: &Arc<MethodDef>) -> Result<Arc<MethodDef>> {
        let mut current = Arc::clone(method);

        loop {
            if !current.is_virtual() || current.is_new_slot() {
                return Ok(current);
            }

            let mut parent = self.type_def(current.declaring)?.base;
            let mut found = None;
            while let Some(token) = parent {
                let ty = self.type_def(token)?;
                found = self
                    .declared_methods(&ty)?
                    .into_iter()
                    .find(|m| m.is_virtual() && m.same_signature(&current));
                if found.is_some() {
                    break;
                }
                parent = ty.base;
            }

            match found {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
    }

    /// Instance methods visible on `ty`: its own, plus inherited non-private ones.
    ///
    /// A method is hidden when a more derived type already contributed one with the same
    /// signature, so overridden virtuals appear once, as their most derived override.
    ///
    /// # Errors
    /// Propagates lookup failures.
    fn instance_methods(&self, ty: &TypeDef) -> Result<Vec<Arc<MethodDef>>> {
        let mut result: Vec<Arc<MethodDef>> = Vec::new();
        let mut current = Some(self.type_def(ty.token)?);
        let mut declared_here = true;

        while let Some(level) = current {
            for method in self.declared_methods(&level)? {
                if method.is_static() {
                    continue;
                }
                if !declared_here && method.access.is_private() {
                    continue;
                }
                if result.iter().any(|seen| seen.same_signature(&method)) {
                    continue;
                }
                result.push(method);
            }

            declared_here = false;
            current = level.base.map(|base| self.type_def(base)).transpose()?;
        }

        Ok(result)
    }

    /// Every interface `ty` implements, directly, through interface inheritance or through
    /// its base classes. Each appears once, in first-discovered order.
    ///
    /// # Errors
    /// Propagates lookup failures.
    fn interfaces(&self, ty: &TypeDef) -> Result<Vec<Token>> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(self.type_def(ty.token)?);

        while let Some(level) = current {
            let mut pending: Vec<Token> = level.interfaces.iter().rev().copied().collect();
            while let Some(iface) = pending.pop() {
                if !seen.insert(iface) {
                    continue;
                }
                result.push(iface);
                pending.extend(self.type_def(iface)?.interfaces.iter().rev().copied());
            }
            current = level.base.map(|base| self.type_def(base)).transpose()?;
        }

        Ok(result)
    }

    /// Pairs each method of `iface` with the method of `ty` that implements it.
    ///
    /// Implementations are matched implicitly by signature, most derived first.
    ///
    /// # Errors
    /// [`Error::UnresolvedOverride`] if an interface method has no implementation.
    fn interface_map(
        &self,
        ty: &TypeDef,
        iface: Token,
    ) -> Result<Vec<(Arc<MethodDef>, Arc<MethodDef>)>> {
        let iface = self.type_def(iface)?;
        let candidates = self.instance_methods(ty)?;

        self.declared_methods(&iface)?
            .into_iter()
            .filter(|m| !m.is_static())
            .map(|slot| {
                candidates
                    .iter()
                    .find(|m| m.same_signature(&slot))
                    .map(|target| (Arc::clone(&slot), Arc::clone(target)))
                    .ok_or_else(|| Error::UnresolvedOverride {
                        ty: ty.full_name(),
                        method: format!("{}.{}", iface.full_name(), slot.name),
                    })
            })
            .collect()
    }
}

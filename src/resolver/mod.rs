//! Type substitution and native linkage.
//!
//! The [`TypeResolver`] is the single place that decides which definition actually backs a
//! type or callable referenced by the program. It is built once from a [`ResolverConfig`]
//! against a [`MetadataProvider`]; every name in the configuration is checked at that point so
//! that discovery never runs into a dangling substitution.
//!
//! # Resolution rules
//!
//! - [`TypeResolver::resolve_type`] maps a substituted type to its replacement and leaves every
//!   other type unchanged.
//! - [`TypeResolver::resolve_callable`] resolves the declaring type and re-locates a member with
//!   the same name and parameter types on it. A substitute that lacks the member is a
//!   configuration error.
//! - [`TypeResolver::native_name`] reports the external symbol of a resolved method, if any.

mod config;

pub use config::{NativeBinding, ResolverConfig, Substitution};

use std::{collections::HashMap, sync::Arc};

use crate::{
    metadata::{Callable, MetadataProvider, ParamDef, Token, TypeDef},
    Result,
};

struct NativeEntry {
    declaring: Token,
    method: String,
    params: Option<Vec<Token>>,
    symbol: String,
}

/// Resolves declared types and callables to their substituted targets.
pub struct TypeResolver<'a> {
    metadata: &'a dyn MetadataProvider,
    substitutions: HashMap<Token, Token>,
    natives: Vec<NativeEntry>,
}

impl<'a> TypeResolver<'a> {
    /// Validates `config` against `metadata` and builds the lookup tables.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if a configured type or method does not exist,
    /// or if a type is substituted twice.
    pub fn new(config: &ResolverConfig, metadata: &'a dyn MetadataProvider) -> Result<Self> {
        let find = |name: &str| -> Result<Arc<TypeDef>> {
            metadata
                .find_type(name)
                .ok_or_else(|| config_error!("Unknown type '{}' in resolver configuration", name))
        };

        let mut substitutions = HashMap::new();
        for sub in &config.substitutions {
            let target = find(&sub.target)?.token;
            let replacement = find(&sub.replacement)?.token;
            if substitutions.insert(target, replacement).is_some() {
                return Err(config_error!("Type '{}' is substituted twice", sub.target));
            }
            log::debug!("Substituting {} with {}", sub.target, sub.replacement);
        }

        let mut natives = Vec::new();
        for binding in &config.natives {
            let ty = find(&binding.type_name)?;
            let has_method = metadata
                .declared_methods(&ty)?
                .iter()
                .any(|m| m.name == binding.method);
            if !has_method {
                return Err(config_error!(
                    "Native binding '{}' names unknown method {}::{}",
                    binding.symbol,
                    binding.type_name,
                    binding.method
                ));
            }

            let params = binding
                .params
                .as_ref()
                .map(|names| {
                    names
                        .iter()
                        .map(|name| find(name).map(|t| t.token))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?;

            natives.push(NativeEntry {
                declaring: ty.token,
                method: binding.method.clone(),
                params,
                symbol: binding.symbol.clone(),
            });
        }

        Ok(TypeResolver {
            metadata,
            substitutions,
            natives,
        })
    }

    /// The metadata this resolver was built against.
    #[must_use]
    pub fn metadata(&self) -> &'a dyn MetadataProvider {
        self.metadata
    }

    /// Returns the substitute for `ty`, or `ty` itself.
    #[must_use]
    pub fn resolve_type(&self, ty: Token) -> Token {
        self.substitutions.get(&ty).copied().unwrap_or(ty)
    }

    fn same_params(&self, lhs: &[ParamDef], rhs: &[ParamDef]) -> bool {
        lhs.len() == rhs.len()
            && lhs.iter().zip(rhs).all(|(a, b)| {
                self.resolve_type(a.param_type) == self.resolve_type(b.param_type)
            })
    }

    /// Re-locates `callable` on its resolved declaring type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the substitute type has no matching member.
    pub fn resolve_callable(&self, callable: &Callable) -> Result<Callable> {
        let declaring = callable.declaring();
        let target = self.resolve_type(declaring);
        if target == declaring {
            return Ok(callable.clone());
        }

        let target_def = self.metadata.type_def(target)?;
        let found = match callable {
            Callable::Method(method) => self
                .metadata
                .declared_methods(&target_def)?
                .into_iter()
                .find(|m| m.name == method.name && self.same_params(&m.params, &method.params))
                .map(Callable::Method),
            Callable::Constructor(ctor) => self
                .metadata
                .constructors(&target_def)?
                .into_iter()
                .find(|c| c.is_static == ctor.is_static && self.same_params(&c.params, &ctor.params))
                .map(Callable::Constructor),
        };

        found.ok_or_else(|| {
            config_error!(
                "Substitute type '{}' has no member matching {}::{}",
                target_def.full_name(),
                self.metadata
                    .type_name(declaring)
                    .unwrap_or_else(|_| declaring.to_string()),
                callable.name()
            )
        })
    }

    /// External symbol name of `callable` after resolution, if it is bound to one.
    ///
    /// Constructors are never native.
    ///
    /// # Errors
    /// Propagates resolution failures.
    pub fn native_name(&self, callable: &Callable) -> Result<Option<String>> {
        let Callable::Method(method) = self.resolve_callable(callable)? else {
            return Ok(None);
        };

        Ok(self
            .natives
            .iter()
            .find(|entry| {
                entry.declaring == method.declaring
                    && entry.method == method.name
                    && entry.params.as_ref().map_or(true, |params| {
                        params.len() == method.params.len()
                            && params
                                .iter()
                                .zip(&method.params)
                                .all(|(p, m)| self.resolve_type(*p) == self.resolve_type(m.param_type))
                    })
            })
            .map(|entry| entry.symbol.clone()))
    }

    /// `true` if `callable` resolves to a method bound to an external symbol.
    ///
    /// # Errors
    /// Propagates resolution failures.
    pub fn is_native(&self, callable: &Callable) -> Result<bool> {
        Ok(self.native_name(callable)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{MetadataBuilder, ProgramMetadata, TypeFlags},
        Error,
    };

    struct Fixture {
        metadata: ProgramMetadata,
        console: Token,
        kconsole: Token,
        write_str: Token,
        write_int: Token,
        kwrite_str: Token,
        kwrite_int: Token,
        ctor: Token,
        kctor: Token,
    }

    fn fixture() -> Fixture {
        let mut b = MetadataBuilder::new();
        let object = b.add_type("System", "Object", TypeFlags::PUBLIC, None);
        let string = b.add_type("System", "String", TypeFlags::PUBLIC, Some(object));
        let int32 = b.add_type("System", "Int32", TypeFlags::PUBLIC, Some(object));
        let console = b.add_type("System", "Console", TypeFlags::PUBLIC, Some(object));
        let kconsole = b.add_type("Kernel", "Console", TypeFlags::PUBLIC, Some(object));

        let write_str = b.add_method(console, "WriteLine", 0x16, None, vec![ParamDef::new(string)], None);
        let write_int = b.add_method(console, "WriteLine", 0x16, None, vec![ParamDef::new(int32)], None);
        let ctor = b.add_constructor(console, false, vec![], None);
        let kwrite_int = b.add_method(kconsole, "WriteLine", 0x16, None, vec![ParamDef::new(int32)], None);
        let kwrite_str = b.add_method(kconsole, "WriteLine", 0x16, None, vec![ParamDef::new(string)], None);
        let kctor = b.add_constructor(kconsole, false, vec![], None);
        b.add_method(console, "Beep", 0x16, None, vec![], None);

        Fixture {
            metadata: b.build().unwrap(),
            console,
            kconsole,
            write_str,
            write_int,
            kwrite_str,
            kwrite_int,
            ctor,
            kctor,
        }
    }

    fn config() -> ResolverConfig {
        ResolverConfig::new()
            .substitute("System.Console", "Kernel.Console")
            .native_overload("Kernel.Console", "WriteLine", &["System.String"], "console_writeline")
    }

    #[test]
    fn resolves_types() {
        let f = fixture();
        let resolver = TypeResolver::new(&config(), &f.metadata).unwrap();
        assert_eq!(resolver.resolve_type(f.console), f.kconsole);
        assert_eq!(resolver.resolve_type(f.kconsole), f.kconsole);
    }

    #[test]
    fn resolves_members_by_signature() {
        let f = fixture();
        let resolver = TypeResolver::new(&config(), &f.metadata).unwrap();

        let write_str = f.metadata.callable(f.write_str).unwrap();
        assert_eq!(resolver.resolve_callable(&write_str).unwrap().token(), f.kwrite_str);

        let write_int = f.metadata.callable(f.write_int).unwrap();
        assert_eq!(resolver.resolve_callable(&write_int).unwrap().token(), f.kwrite_int);

        let ctor = f.metadata.callable(f.ctor).unwrap();
        assert_eq!(resolver.resolve_callable(&ctor).unwrap().token(), f.kctor);
    }

    #[test]
    fn missing_substitute_member() {
        let f = fixture();
        let resolver = TypeResolver::new(&config(), &f.metadata).unwrap();
        let console = f.metadata.type_def(f.console).unwrap();
        let beep = f
            .metadata
            .declared_methods(&console)
            .unwrap()
            .into_iter()
            .find(|m| m.name == "Beep")
            .unwrap();

        let err = resolver.resolve_callable(&Callable::Method(beep)).unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("Kernel.Console")));
    }

    #[test]
    fn native_overloads() {
        let f = fixture();
        let resolver = TypeResolver::new(&config(), &f.metadata).unwrap();

        let write_str = f.metadata.callable(f.write_str).unwrap();
        assert_eq!(
            resolver.native_name(&write_str).unwrap().as_deref(),
            Some("console_writeline")
        );

        let write_int = f.metadata.callable(f.write_int).unwrap();
        assert!(!resolver.is_native(&write_int).unwrap());

        let ctor = f.metadata.callable(f.ctor).unwrap();
        assert!(!resolver.is_native(&ctor).unwrap());
    }

    #[test]
    fn invalid_configuration() {
        let f = fixture();
        let unknown_type = ResolverConfig::new().substitute("System.Nope", "Kernel.Console");
        assert!(TypeResolver::new(&unknown_type, &f.metadata).is_err());

        let unknown_method = ResolverConfig::new().native("Kernel.Console", "Nope", "nope");
        assert!(TypeResolver::new(&unknown_method, &f.metadata).is_err());

        let twice = ResolverConfig::new()
            .substitute("System.Console", "Kernel.Console")
            .substitute("System.Console", "System.Object");
        assert!(TypeResolver::new(&twice, &f.metadata).is_err());
    }
}

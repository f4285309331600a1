//! Mangled names.
//!
//! A mangled name is the single key the compiler uses to identify a compiled artifact: two
//! equal names denote the same type record, method record, native binding or vtable.
//!
//! - types: `Namespace.Name`, with `_static` appended for the record holding static fields
//! - callables: `{ret}___{param}__{param}__..._{Namespace.Type}.{Name}` followed by `_static`
//!   for static members and `_constr` for constructors. Void returns (and all constructors)
//!   use `System.Void`.
//!
//! ```text
//! System.Void___System.String___Demo.Program.Main_static
//! System.Void____Demo.Widget..ctor_constr
//! ```

use crate::{
    metadata::{defs::Callable, defs::TypeDef, provider::MetadataProvider, token::Token},
    Result,
};

/// Name used for void return types.
pub const VOID_TYPE_NAME: &str = "System.Void";

/// Derives mangled names from metadata definitions.
pub struct NameMangler;

impl NameMangler {
    /// Mangled name of `ty`'s instance or static record.
    #[must_use]
    pub fn mangle_type(ty: &TypeDef, is_static: bool) -> String {
        let mut name = ty.full_name();
        if is_static {
            name.push_str("_static");
        }
        name
    }

    /// Mangled name of the type behind `token`.
    ///
    /// # Errors
    /// Propagates lookup failures.
    pub fn type_name(
        metadata: &dyn MetadataProvider,
        token: Token,
        is_static: bool,
    ) -> Result<String> {
        let def = metadata.type_def(token)?;
        Ok(Self::mangle_type(&def, is_static))
    }

    /// Mangled name of a method or constructor.
    ///
    /// # Errors
    /// Propagates lookup failures of the declaring, parameter or return types.
    pub fn mangle_callable(metadata: &dyn MetadataProvider, callable: &Callable) -> Result<String> {
        let mut name = match callable.returns() {
            Some(ret) => Self::type_name(metadata, ret, false)?,
            None => VOID_TYPE_NAME.to_string(),
        };
        name.push_str("___");

        for param in callable.params() {
            name.push_str(&Self::type_name(metadata, param.param_type, false)?);
            name.push_str("__");
        }

        name.push('_');
        name.push_str(&metadata.type_name(callable.declaring())?);
        name.push('.');
        name.push_str(callable.name());

        if callable.is_static() {
            name.push_str("_static");
        }
        if callable.is_constructor() {
            name.push_str("_constr");
        }
        Ok(name)
    }
}

//! Definitions of types, fields, methods and constructors.
//!
//! These are the owned, immutable views that a [`crate::metadata::MetadataProvider`] hands
//! out. Definitions reference each other exclusively through [`Token`]s; the provider resolves
//! them.

use std::sync::Arc;

use crate::metadata::{
    flags::{MethodAccessFlags, MethodModifiers, MethodVtableFlags, ParamFlags, TypeFlags},
    token::Token,
};

/// A type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// Token of this type
    pub token: Token,
    /// Namespace, may be empty
    pub namespace: String,
    /// Simple name (array types carry the `[]` suffix, e.g. `Int32[]`)
    pub name: String,
    /// Type attributes
    pub flags: TypeFlags,
    /// Base class, `None` for the root object type and for interfaces
    pub base: Option<Token>,
    /// Element type for array types
    pub element: Option<Token>,
    /// Directly implemented interfaces, in declaration order
    pub interfaces: Vec<Token>,
    /// Declared fields, in declaration order
    pub fields: Vec<Token>,
    /// Declared methods, in declaration order
    pub methods: Vec<Token>,
    /// Declared constructors, in declaration order
    pub constructors: Vec<Token>,
}

impl TypeDef {
    /// `Namespace.Name`, or just `Name` for types in the global namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// `true` if this type is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeFlags::INTERFACE)
    }

    /// `true` if this type is an array of [`TypeDef::element`].
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.element.is_some()
    }
}

/// A field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Token of this field
    pub token: Token,
    /// Field name
    pub name: String,
    /// Declaring type
    pub declaring: Token,
    /// Type of the field
    pub field_type: Token,
    /// `true` for static fields
    pub is_static: bool,
}

/// One parameter of a method or constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDef {
    /// Parameter type
    pub param_type: Token,
    /// In/out/optional markers
    pub flags: ParamFlags,
}

impl ParamDef {
    /// A plain parameter of type `param_type`.
    #[must_use]
    pub fn new(param_type: Token) -> Self {
        ParamDef {
            param_type,
            flags: ParamFlags::empty(),
        }
    }

    /// A parameter of type `param_type` carrying `flags`.
    #[must_use]
    pub fn with_flags(param_type: Token, flags: ParamFlags) -> Self {
        ParamDef { param_type, flags }
    }
}

/// Bytecode and frame information of a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Maximum operand stack depth declared by the body
    pub max_stack: u32,
    /// Whether locals are zero-initialised
    pub init_locals: bool,
    /// Raw CIL bytes
    pub code: Vec<u8>,
}

impl MethodBody {
    /// Creates a body from its parts.
    #[must_use]
    pub fn new(max_stack: u32, init_locals: bool, code: Vec<u8>) -> Self {
        MethodBody {
            max_stack,
            init_locals,
            code,
        }
    }
}

/// A method definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Token of this method
    pub token: Token,
    /// Method name
    pub name: String,
    /// Declaring type
    pub declaring: Token,
    /// Access flags
    pub access: MethodAccessFlags,
    /// Modifiers (static, virtual, final, abstract, ...)
    pub modifiers: MethodModifiers,
    /// Vtable layout flag
    pub vtable_layout: MethodVtableFlags,
    /// Return type, `None` for void
    pub returns: Option<Token>,
    /// Parameters, in declaration order
    pub params: Vec<ParamDef>,
    /// Body, absent for abstract and externally implemented methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    /// `true` for virtual methods.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.modifiers.contains(MethodModifiers::VIRTUAL)
    }

    /// `true` for abstract methods.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(MethodModifiers::ABSTRACT)
    }

    /// `true` for sealed (final) methods.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.modifiers.contains(MethodModifiers::FINAL)
    }

    /// `true` if the method always introduces a new vtable slot.
    #[must_use]
    pub fn is_new_slot(&self) -> bool {
        self.vtable_layout.contains(MethodVtableFlags::NEW_SLOT)
    }

    /// Compares name, return type and parameters (type and in/out/optional markers).
    #[must_use]
    pub fn same_signature(&self, other: &MethodDef) -> bool {
        self.name == other.name && self.returns == other.returns && self.params == other.params
    }
}

/// A constructor definition (instance `.ctor` or static `.cctor`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDef {
    /// Token of this constructor
    pub token: Token,
    /// Declaring type
    pub declaring: Token,
    /// `true` for the type initializer
    pub is_static: bool,
    /// Parameters, in declaration order
    pub params: Vec<ParamDef>,
    /// Body
    pub body: Option<MethodBody>,
}

impl ConstructorDef {
    /// `.cctor` for type initializers, `.ctor` otherwise.
    #[must_use]
    pub fn name(&self) -> &'static str {
        if self.is_static {
            ".cctor"
        } else {
            ".ctor"
        }
    }
}

/// Anything that can be invoked: a method or a constructor.
///
/// Equality is identity, the metadata token.
#[derive(Debug, Clone)]
pub enum Callable {
    /// A method
    Method(Arc<MethodDef>),
    /// A constructor
    Constructor(Arc<ConstructorDef>),
}

impl Callable {
    /// Token of the underlying definition.
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            Callable::Method(m) => m.token,
            Callable::Constructor(c) => c.token,
        }
    }

    /// Member name (`.ctor`/`.cctor` for constructors).
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Callable::Method(m) => &m.name,
            Callable::Constructor(c) => c.name(),
        }
    }

    /// Declaring type.
    #[must_use]
    pub fn declaring(&self) -> Token {
        match self {
            Callable::Method(m) => m.declaring,
            Callable::Constructor(c) => c.declaring,
        }
    }

    /// `true` if there is no `this` argument.
    #[must_use]
    pub fn is_static(&self) -> bool {
        match self {
            Callable::Method(m) => m.is_static(),
            Callable::Constructor(c) => c.is_static,
        }
    }

    /// `true` for constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        matches!(self, Callable::Constructor(_))
    }

    /// Return type; constructors are void.
    #[must_use]
    pub fn returns(&self) -> Option<Token> {
        match self {
            Callable::Method(m) => m.returns,
            Callable::Constructor(_) => None,
        }
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamDef] {
        match self {
            Callable::Method(m) => &m.params,
            Callable::Constructor(c) => &c.params,
        }
    }

    /// Body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&MethodBody> {
        match self {
            Callable::Method(m) => m.body.as_ref(),
            Callable::Constructor(c) => c.body.as_ref(),
        }
    }

    /// Number of operands a call consumes: parameters plus `this` for instance members.
    #[must_use]
    pub fn stack_inputs(&self) -> usize {
        self.params().len() + usize::from(!self.is_static())
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl Eq for Callable {}

impl From<Arc<MethodDef>> for Callable {
    fn from(method: Arc<MethodDef>) -> Self {
        Callable::Method(method)
    }
}

impl From<Arc<ConstructorDef>> for Callable {
    fn from(ctor: Arc<ConstructorDef>) -> Self {
        Callable::Constructor(ctor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, modifiers: MethodModifiers, params: Vec<ParamDef>) -> MethodDef {
        MethodDef {
            token: Token(0x0600_0001),
            name: name.to_string(),
            declaring: Token(0x0200_0001),
            access: MethodAccessFlags::PUBLIC,
            modifiers,
            vtable_layout: MethodVtableFlags::REUSE_SLOT,
            returns: None,
            params,
            body: None,
        }
    }

    #[test]
    fn signature_includes_param_flags() {
        let a = method("Foo", MethodModifiers::VIRTUAL, vec![ParamDef::new(Token(0x0200_0002))]);
        let mut b = a.clone();
        b.token = Token(0x0600_0002);
        assert!(a.same_signature(&b));

        b.params = vec![ParamDef::with_flags(Token(0x0200_0002), ParamFlags::OUT)];
        assert!(!a.same_signature(&b));

        b.params = vec![];
        assert!(!a.same_signature(&b));
    }

    #[test]
    fn callable_shape() {
        let m = Callable::from(Arc::new(method(
            "Foo",
            MethodModifiers::STATIC,
            vec![ParamDef::new(Token(0x0200_0002))],
        )));
        assert!(m.is_static());
        assert_eq!(m.stack_inputs(), 1);

        let ctor = Callable::from(Arc::new(ConstructorDef {
            token: Token(0x0600_0009),
            declaring: Token(0x0200_0001),
            is_static: false,
            params: vec![ParamDef::new(Token(0x0200_0002))],
            body: None,
        }));
        assert!(ctor.is_constructor());
        assert_eq!(ctor.name(), ".ctor");
        assert_eq!(ctor.returns(), None);
        assert_eq!(ctor.stack_inputs(), 2);
        assert_ne!(m, ctor);
    }

    #[test]
    fn type_names() {
        let ty = TypeDef {
            token: Token(0x0200_0001),
            namespace: String::new(),
            name: "Global".to_string(),
            flags: TypeFlags::empty(),
            base: None,
            element: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            constructors: vec![],
        };
        assert_eq!(ty.full_name(), "Global");

        let nested = TypeDef {
            namespace: "Demo".to_string(),
            ..ty
        };
        assert_eq!(nested.full_name(), "Demo.Global");
    }
}

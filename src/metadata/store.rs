//! In-memory program metadata and its builder.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use crate::{
    metadata::{
        defs::{Callable, ConstructorDef, FieldDef, MethodBody, MethodDef, ParamDef, TypeDef},
        flags::{MethodAccessFlags, MethodModifiers, MethodVtableFlags, TypeFlags},
        loader,
        provider::MetadataProvider,
        token::{Token, TokenKind},
    },
    Error, Result,
};

/// A complete, immutable program description held in memory.
///
/// Built with [`MetadataBuilder`] or loaded from the XML program description format with
/// [`ProgramMetadata::from_xml`].
#[derive(Debug, Default)]
pub struct ProgramMetadata {
    types: BTreeMap<Token, Arc<TypeDef>>,
    type_names: HashMap<String, Token>,
    fields: BTreeMap<Token, Arc<FieldDef>>,
    callables: BTreeMap<Token, Callable>,
    strings: BTreeMap<Token, String>,
}

impl ProgramMetadata {
    /// Parses an XML program description.
    ///
    /// # Errors
    /// Returns [`Error::Xml`] or [`Error::Configuration`] for invalid documents.
    pub fn from_xml(source: &str) -> Result<Self> {
        loader::load_program(source)
    }

    /// Reads and parses an XML program description from disk.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the file cannot be read, otherwise as
    /// [`ProgramMetadata::from_xml`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_xml(&source)
    }

    /// All types, ordered by token.
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDef>> {
        self.types.values()
    }

    /// Number of types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of methods and constructors.
    #[must_use]
    pub fn callable_count(&self) -> usize {
        self.callables.len()
    }
}

impl MetadataProvider for ProgramMetadata {
    fn type_def(&self, token: Token) -> Result<Arc<TypeDef>> {
        self.types
            .get(&token)
            .cloned()
            .ok_or(Error::MetadataNotFound(token))
    }

    fn field(&self, token: Token) -> Result<Arc<FieldDef>> {
        self.fields
            .get(&token)
            .cloned()
            .ok_or(Error::MetadataNotFound(token))
    }

    fn callable(&self, token: Token) -> Result<Callable> {
        self.callables
            .get(&token)
            .cloned()
            .ok_or(Error::MetadataNotFound(token))
    }

    fn user_string(&self, token: Token) -> Result<String> {
        self.strings
            .get(&token)
            .cloned()
            .ok_or(Error::MetadataNotFound(token))
    }

    fn find_type(&self, full_name: &str) -> Option<Arc<TypeDef>> {
        self.type_names
            .get(full_name)
            .and_then(|token| self.types.get(token))
            .cloned()
    }
}

/// Incrementally assembles a [`ProgramMetadata`].
///
/// The `add_*` methods allocate the next free row of the matching token kind; the `define_*`
/// methods take an explicit token, as the XML loader does. Members are attached to their
/// declaring type in call order.
///
/// ```rust
/// use cardinal::metadata::{MetadataBuilder, MethodBody, TypeFlags};
///
/// let mut builder = MetadataBuilder::new();
/// let object = builder.add_type("System", "Object", TypeFlags::PUBLIC, None);
/// let program = builder.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(object));
/// builder.add_method(program, "Main", 0x0016, None, vec![], Some(MethodBody::new(8, true, vec![0x2A])));
///
/// let metadata = builder.build()?;
/// assert_eq!(metadata.type_count(), 2);
/// # Ok::<(), cardinal::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    types: Vec<TypeDef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    constructors: Vec<ConstructorDef>,
    strings: Vec<(Token, String)>,
    next_rows: HashMap<TokenKind, u32>,
}

impl MetadataBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, kind: TokenKind) -> Token {
        let row = self.next_rows.entry(kind).or_insert(0);
        *row += 1;
        Token::from_parts(kind, *row)
    }

    fn reserve(&mut self, token: Token) {
        if let Some(kind) = token.kind() {
            let row = self.next_rows.entry(kind).or_insert(0);
            *row = (*row).max(token.row());
        }
    }

    fn type_mut(&mut self, token: Token) -> Option<&mut TypeDef> {
        self.types.iter_mut().find(|ty| ty.token == token)
    }

    /// Adds a type and returns its token.
    pub fn add_type(
        &mut self,
        namespace: &str,
        name: &str,
        flags: TypeFlags,
        base: Option<Token>,
    ) -> Token {
        let token = self.allocate(TokenKind::TypeDef);
        self.define_type(token, namespace, name, flags, base)
    }

    /// Adds a type under an explicit token.
    pub fn define_type(
        &mut self,
        token: Token,
        namespace: &str,
        name: &str,
        flags: TypeFlags,
        base: Option<Token>,
    ) -> Token {
        self.reserve(token);
        self.types.push(TypeDef {
            token,
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            base,
            element: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        });
        token
    }

    /// Adds an array type `element[]` deriving from `base` and returns its token.
    pub fn add_array_type(&mut self, element: Token, base: Option<Token>) -> Token {
        let token = self.allocate(TokenKind::TypeDef);
        self.define_array_type(token, element, base)
    }

    /// Adds an array type under an explicit token.
    pub fn define_array_type(&mut self, token: Token, element: Token, base: Option<Token>) -> Token {
        let (namespace, name) = self
            .types
            .iter()
            .find(|ty| ty.token == element)
            .map(|ty| (ty.namespace.clone(), format!("{}[]", ty.name)))
            .unwrap_or_else(|| (String::new(), format!("{element}[]")));

        self.define_type(token, &namespace, &name, TypeFlags::PUBLIC, base);
        self.set_element_type(token, element);
        token
    }

    /// Marks `array` as an array of `element`.
    pub fn set_element_type(&mut self, array: Token, element: Token) {
        if let Some(ty) = self.type_mut(array) {
            ty.element = Some(element);
        }
    }

    /// Records that `ty` implements `iface`.
    pub fn add_interface(&mut self, ty: Token, iface: Token) {
        if let Some(def) = self.type_mut(ty) {
            def.interfaces.push(iface);
        }
    }

    /// Adds a field and returns its token.
    pub fn add_field(&mut self, declaring: Token, name: &str, field_type: Token, is_static: bool) -> Token {
        let token = self.allocate(TokenKind::Field);
        self.define_field(token, declaring, name, field_type, is_static)
    }

    /// Adds a field under an explicit token.
    pub fn define_field(
        &mut self,
        token: Token,
        declaring: Token,
        name: &str,
        field_type: Token,
        is_static: bool,
    ) -> Token {
        self.reserve(token);
        self.fields.push(FieldDef {
            token,
            name: name.to_string(),
            declaring,
            field_type,
            is_static,
        });
        if let Some(def) = self.type_mut(declaring) {
            def.fields.push(token);
        }
        token
    }

    /// Adds a method and returns its token.
    ///
    /// `flags` is a raw ECMA-335 method attribute word; `returns` is `None` for void.
    pub fn add_method(
        &mut self,
        declaring: Token,
        name: &str,
        flags: u32,
        returns: Option<Token>,
        params: Vec<ParamDef>,
        body: Option<MethodBody>,
    ) -> Token {
        let token = self.allocate(TokenKind::MethodDef);
        self.define_method(token, declaring, name, flags, returns, params, body)
    }

    /// Adds a method under an explicit token.
    pub fn define_method(
        &mut self,
        token: Token,
        declaring: Token,
        name: &str,
        flags: u32,
        returns: Option<Token>,
        params: Vec<ParamDef>,
        body: Option<MethodBody>,
    ) -> Token {
        self.reserve(token);
        self.methods.push(MethodDef {
            token,
            name: name.to_string(),
            declaring,
            access: MethodAccessFlags::from_method_flags(flags),
            modifiers: MethodModifiers::from_method_flags(flags),
            vtable_layout: MethodVtableFlags::from_method_flags(flags),
            returns,
            params,
            body,
        });
        if let Some(def) = self.type_mut(declaring) {
            def.methods.push(token);
        }
        token
    }

    /// Adds a constructor and returns its token.
    pub fn add_constructor(
        &mut self,
        declaring: Token,
        is_static: bool,
        params: Vec<ParamDef>,
        body: Option<MethodBody>,
    ) -> Token {
        let token = self.allocate(TokenKind::MethodDef);
        self.define_constructor(token, declaring, is_static, params, body)
    }

    /// Adds a constructor under an explicit token.
    pub fn define_constructor(
        &mut self,
        token: Token,
        declaring: Token,
        is_static: bool,
        params: Vec<ParamDef>,
        body: Option<MethodBody>,
    ) -> Token {
        self.reserve(token);
        self.constructors.push(ConstructorDef {
            token,
            declaring,
            is_static,
            params,
            body,
        });
        if let Some(def) = self.type_mut(declaring) {
            def.constructors.push(token);
        }
        token
    }

    /// Adds a string literal and returns its token.
    pub fn add_string(&mut self, value: &str) -> Token {
        let token = self.allocate(TokenKind::UserString);
        self.define_string(token, value)
    }

    /// Adds a string literal under an explicit token.
    pub fn define_string(&mut self, token: Token, value: &str) -> Token {
        self.reserve(token);
        self.strings.push((token, value.to_string()));
        token
    }

    /// Validates cross references and freezes the program.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for duplicate tokens or type names, references to
    /// unknown types, or cyclic inheritance.
    pub fn build(self) -> Result<ProgramMetadata> {
        let mut metadata = ProgramMetadata::default();

        for ty in self.types {
            let name = ty.full_name();
            if metadata.type_names.insert(name.clone(), ty.token).is_some() {
                return Err(config_error!("Type '{}' is defined twice", name));
            }
            if metadata.types.insert(ty.token, Arc::new(ty)).is_some() {
                return Err(config_error!("Type token for '{}' is already in use", name));
            }
        }

        let mut tokens: HashSet<Token> = metadata.types.keys().copied().collect();
        let mut claim = |token: Token| {
            if tokens.insert(token) {
                Ok(())
            } else {
                Err(config_error!("Token {} is defined twice", token))
            }
        };

        for field in self.fields {
            claim(field.token)?;
            metadata.fields.insert(field.token, Arc::new(field));
        }
        for method in self.methods {
            claim(method.token)?;
            metadata
                .callables
                .insert(method.token, Callable::Method(Arc::new(method)));
        }
        for ctor in self.constructors {
            claim(ctor.token)?;
            metadata
                .callables
                .insert(ctor.token, Callable::Constructor(Arc::new(ctor)));
        }
        for (token, value) in self.strings {
            claim(token)?;
            metadata.strings.insert(token, value);
        }

        metadata.validate()?;
        Ok(metadata)
    }
}

impl ProgramMetadata {
    fn validate(&self) -> Result<()> {
        let known = |token: Token, what: &str, owner: &str| -> Result<()> {
            if self.types.contains_key(&token) {
                Ok(())
            } else {
                Err(config_error!("{} of '{}' references unknown type {}", what, owner, token))
            }
        };

        for ty in self.types.values() {
            let name = ty.full_name();
            for token in ty.base.iter().chain(ty.element.iter()).chain(&ty.interfaces) {
                known(*token, "Type reference", &name)?;
            }

            let mut seen = HashSet::new();
            let mut current = Some(ty.token);
            while let Some(token) = current {
                if !seen.insert(token) {
                    return Err(config_error!("Inheritance chain of '{}' is cyclic", name));
                }
                current = self.types.get(&token).and_then(|t| t.base);
            }
        }

        for field in self.fields.values() {
            known(field.declaring, "Declaring type", &field.name)?;
            known(field.field_type, "Field type", &field.name)?;
        }

        for callable in self.callables.values() {
            known(callable.declaring(), "Declaring type", callable.name())?;
            for param in callable.params() {
                known(param.param_type, "Parameter", callable.name())?;
            }
            if let Some(ret) = callable.returns() {
                known(ret, "Return type", callable.name())?;
            }
        }

        Ok(())
    }
}

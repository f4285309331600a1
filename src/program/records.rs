//! Output records of a compilation.

use std::collections::{BTreeMap, HashSet};

use crate::translate::Operation;

/// One emitted instruction.
///
/// `parameters` are ids of earlier tokens of the same method, ordered as the instruction's
/// pop order; `constants` carry operation-specific immediates (targets, tokens, kinds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaToken {
    /// Unique within the method, strictly increasing in decode order
    pub id: u32,
    /// Byte offset of the source instruction
    pub offset: u32,
    /// Instruction kind
    pub operation: Operation,
    /// Producer token ids
    pub parameters: Vec<u32>,
    /// Immediate payload
    pub constants: Vec<u64>,
    /// Literal or call-target mangled name
    pub string: Option<String>,
}

impl SsaToken {
    /// Creates a token without inputs or payload.
    #[must_use]
    pub fn new(id: u32, offset: u32, operation: Operation) -> Self {
        SsaToken {
            id,
            offset,
            operation,
            parameters: Vec::new(),
            constants: Vec::new(),
            string: None,
        }
    }

    /// Sets the producer ids.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<u32>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the immediate payload.
    #[must_use]
    pub fn with_constants(mut self, constants: Vec<u64>) -> Self {
        self.constants = constants;
        self
    }

    /// Sets the string payload. An empty string is stored as absent, matching the image format.
    #[must_use]
    pub fn with_string(mut self, string: impl Into<String>) -> Self {
        let string = string.into();
        self.string = (!string.is_empty()).then_some(string);
        self
    }
}

/// A translated method or constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    /// Mangled name of the resolved callable
    pub name: String,
    /// No `this` argument
    pub is_static: bool,
    /// Constructor or type initializer
    pub is_constructor: bool,
    /// Locals are zero-initialised on entry
    pub init_locals: bool,
    /// Maximum evaluation stack depth declared by the body
    pub max_stack: u32,
    /// String pool, indexed by `ldstr` constants
    pub strings: Vec<String>,
    /// Instruction graph in decode order
    pub tokens: Vec<SsaToken>,
}

/// Field layout of a type's instance or static part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRecord {
    /// Mangled type name (`_static` suffix for the static record)
    pub name: String,
    /// Holds static fields
    pub is_static: bool,
    /// `(mangled field type, field name)` in declaration order
    pub fields: Vec<(String, String)>,
}

impl TypeRecord {
    /// Creates a record without fields.
    #[must_use]
    pub fn new(name: impl Into<String>, is_static: bool) -> Self {
        TypeRecord {
            name: name.into(),
            is_static,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn add_field(&mut self, field_type: impl Into<String>, name: impl Into<String>) {
        self.fields.push((field_type.into(), name.into()));
    }
}

/// Everything a compilation produced.
///
/// Records are append-only; `type_names` and `method_names` gate re-visits. Native bindings are
/// kept sorted so that images are byte-for-byte reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Records {
    /// Instance and static type records in discovery order
    pub type_records: Vec<TypeRecord>,
    /// Method records in translation order
    pub method_records: Vec<MethodRecord>,
    /// Mangled names of emitted type records
    pub type_names: HashSet<String>,
    /// Mangled names of emitted method records
    pub method_names: HashSet<String>,
    /// Mangled name -> external symbol
    pub native_methods: BTreeMap<String, String>,
}

impl Records {
    /// Creates an empty set of records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type record unless one with the same name exists. Returns `true` if added.
    pub fn add_type(&mut self, record: TypeRecord) -> bool {
        if !self.type_names.insert(record.name.clone()) {
            return false;
        }
        self.type_records.push(record);
        true
    }

    /// Adds a method record unless one with the same name exists. Returns `true` if added.
    pub fn add_method(&mut self, record: MethodRecord) -> bool {
        if !self.method_names.insert(record.name.clone()) {
            return false;
        }
        self.method_records.push(record);
        true
    }

    /// Method record by mangled name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodRecord> {
        self.method_records.iter().find(|record| record.name == name)
    }

    /// Type record by mangled name.
    #[must_use]
    pub fn type_record(&self, name: &str) -> Option<&TypeRecord> {
        self.type_records.iter().find(|record| record.name == name)
    }

    /// Serialises to the program image format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        super::ProgramWriter::new(self).to_bytes()
    }

    /// Parses a program image.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] for a bad magic or truncated image.
    pub fn from_bytes(data: &[u8]) -> crate::Result<Self> {
        super::ProgramReader::from_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_gates_duplicates() {
        let mut records = Records::new();
        assert!(records.add_type(TypeRecord::new("Demo.Point", false)));
        assert!(!records.add_type(TypeRecord::new("Demo.Point", false)));
        assert!(records.add_type(TypeRecord::new("Demo.Point_static", true)));
        assert_eq!(records.type_records.len(), 2);
        assert!(records.type_record("Demo.Point_static").unwrap().is_static);
    }

    #[test]
    fn empty_string_is_absent() {
        let token = SsaToken::new(0, 0, Operation::LoadString).with_string("");
        assert_eq!(token.string, None);

        let token = token.with_string("hi");
        assert_eq!(token.string.as_deref(), Some("hi"));
    }

    #[test]
    fn duplicate_field_types_are_kept() {
        let mut record = TypeRecord::new("Demo.Point", false);
        record.add_field("System.Int32", "x");
        record.add_field("System.Int32", "y");
        assert_eq!(record.fields.len(), 2);
    }
}

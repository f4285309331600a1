use thiserror::Error;

use crate::metadata::token::Token;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant is fatal for the compilation that raises it. The translator and the vtable
/// builder are fail-fast passes over a presumed well-formed program; the variants carry enough
/// context (method, instruction offset, type) to point at the offending input.
///
/// # Error Categories
///
/// ## Decoding and Translation
/// - [`Error::TruncatedStream`] - the instruction cursor ran past the end of a method body
/// - [`Error::UnsupportedOpcode`] - an opcode without a translation rule
/// - [`Error::StackImbalance`] - the simulated operand stack is inconsistent
/// - [`Error::ConstrainedPrefix`] - a `constrained.` prefix not followed by `callvirt`
/// - [`Error::MissingMethodBody`] - a reachable callable has no bytecode
///
/// ## Layout and Naming
/// - [`Error::UnresolvedOverride`] - an override without a matching base slot
/// - [`Error::DuplicateDefinition`] - two distinct entities share a mangled name
///
/// ## Input and Output
/// - [`Error::MalformedImage`] - a program image failed to parse
/// - [`Error::MetadataNotFound`] / [`Error::InvalidToken`] - dangling metadata references
/// - [`Error::Configuration`] - invalid resolver configuration or program description
/// - [`Error::FileError`] / [`Error::Xml`] - I/O and XML failures
///
/// # Examples
///
/// ```rust,no_run
/// use cardinal::{Error, ProgramReader};
///
/// match ProgramReader::from_file("program.cself") {
///     Ok(records) => println!("{} methods", records.method_records.len()),
///     Err(Error::MalformedImage { message, .. }) => eprintln!("Bad image: {message}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The instruction cursor tried to read past the end of the byte buffer.
    ///
    /// Raised by [`crate::decoder::InstructionStream`] when an opcode or one of its operands
    /// extends beyond the method body.
    #[error("Truncated instruction stream at offset 0x{offset:04X}: needed {needed} bytes, {available} available")]
    TruncatedStream {
        /// Offset at which the read was attempted
        offset: usize,
        /// Number of bytes required
        needed: usize,
        /// Number of bytes left in the buffer
        available: usize,
    },

    /// An opcode has no translation rule.
    ///
    /// There is no silent skip; any opcode outside the recognised families aborts the run.
    #[error("Unsupported opcode {opcode} at offset 0x{offset:04X} in {method}")]
    UnsupportedOpcode {
        /// Mangled name of the method being translated (empty when raised by the bare decoder)
        method: String,
        /// Offset of the instruction
        offset: usize,
        /// Opcode mnemonic or raw encoding
        opcode: String,
    },

    /// The simulated operand stack does not match what an instruction requires.
    ///
    /// Raised when an instruction pops from an empty stack, or when values remain on the
    /// stack after a return consumed its result.
    #[error("Stack imbalance at offset 0x{offset:04X} in {method}: {message}")]
    StackImbalance {
        /// Mangled name of the method being translated
        method: String,
        /// Offset of the instruction
        offset: usize,
        /// What went wrong
        message: String,
    },

    /// A `constrained.` prefix was followed by something other than `callvirt`.
    #[error("Dangling constrained. prefix before offset 0x{offset:04X} in {method}")]
    ConstrainedPrefix {
        /// Mangled name of the method being translated
        method: String,
        /// Offset of the instruction following the prefix
        offset: usize,
    },

    /// A reachable, non-native callable has no method body.
    #[error("No method body available for {0}")]
    MissingMethodBody(String),

    /// The vtable builder expected an overridden base slot and found none.
    #[error("No base slot of {ty} matches override {method}")]
    UnresolvedOverride {
        /// Type whose layout was being built
        ty: String,
        /// Method that failed to match
        method: String,
    },

    /// Two semantically distinct entities produced the same mangled name.
    ///
    /// Indicates a defect in name mangling; it should never occur for valid input.
    #[error("Mangled name {name} is claimed by two distinct definitions")]
    DuplicateDefinition {
        /// The colliding name
        name: String,
    },

    /// A program image could not be parsed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    MalformedImage {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A metadata token does not resolve to any definition.
    #[error("Metadata for token {0} not found")]
    MetadataNotFound(Token),

    /// A metadata token resolves, but to the wrong kind of definition.
    #[error("Token {token} does not reference a {expected}")]
    InvalidToken {
        /// The offending token
        token: Token,
        /// What kind of definition was expected
        expected: &'static str,
    },

    /// Resolver configuration or program description is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Filesystem I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// XML reader error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    /// Fills in the method name for errors raised below the translator.
    ///
    /// The decoder does not know which method it is decoding; the translator calls this on the
    /// way out so diagnostics always name the offending method.
    #[must_use]
    pub fn in_method(self, name: &str) -> Self {
        match self {
            Error::UnsupportedOpcode {
                method,
                offset,
                opcode,
            } if method.is_empty() => Error::UnsupportedOpcode {
                method: name.to_string(),
                offset,
                opcode,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_method_fills_empty_name() {
        let err = Error::UnsupportedOpcode {
            method: String::new(),
            offset: 4,
            opcode: "arglist".to_string(),
        }
        .in_method("System.Void___Demo.Program.Main_static");

        match err {
            Error::UnsupportedOpcode { method, offset, .. } => {
                assert_eq!(method, "System.Void___Demo.Program.Main_static");
                assert_eq!(offset, 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn in_method_keeps_existing_name() {
        let err = Error::UnsupportedOpcode {
            method: "a".to_string(),
            offset: 0,
            opcode: "x".to_string(),
        }
        .in_method("b");
        assert!(matches!(err, Error::UnsupportedOpcode { method, .. } if method == "a"));
    }

    #[test]
    fn malformed_macro_records_location() {
        let err = malformed_error!("bad magic {:08X}", 0x1234_5678u32);
        match err {
            Error::MalformedImage { message, file, .. } => {
                assert_eq!(message, "bad magic 12345678");
                assert!(file.ends_with("error.rs"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

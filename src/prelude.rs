//! # cardinal Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the cardinal library. Import this module to get quick access to everything needed
//! to describe a program, configure the resolver, run a compilation and read its output.
//!
//! ```rust,no_run
//! use cardinal::prelude::*;
//!
//! let records = ProgramReader::from_file("program.cself")?;
//! for method in &records.method_records {
//!     println!("{}: {} tokens", method.name, method.tokens.len());
//! }
//! # Ok::<(), cardinal::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cardinal operations
pub use crate::Error;

/// The result type used throughout cardinal
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Whole-program compilation driver and its output
pub use crate::compiler::{Compilation, Compiler, CompilerOptions};

/// Type substitution and native linkage
pub use crate::resolver::{ResolverConfig, TypeResolver};

// ================================================================================================
// Program Metadata
// ================================================================================================

/// Metadata token type for referencing definitions
pub use crate::metadata::{Token, TokenKind};

/// Definitions handed out by a metadata provider
pub use crate::metadata::{
    Callable, ConstructorDef, FieldDef, MethodBody, MethodDef, ParamDef, TypeDef,
};

/// Attribute flag sets
pub use crate::metadata::{MethodAccessFlags, MethodModifiers, MethodVtableFlags, ParamFlags, TypeFlags};

/// Metadata sources and name mangling
pub use crate::metadata::{MetadataBuilder, MetadataProvider, NameMangler, ProgramMetadata};

// ================================================================================================
// Decoding and Translation
// ================================================================================================

/// Instruction cursor and opcode descriptors
pub use crate::decoder::{InstructionStream, OpCode, OperandType};

/// Token operations and the per-method translator
pub use crate::translate::{Discovery, Operation, Translation, Translator, ValueKind};

// ================================================================================================
// Output
// ================================================================================================

/// Records and the program image format
pub use crate::program::{
    MethodRecord, ProgramReader, ProgramWriter, Records, SsaToken, TypeRecord, IMAGE_MAGIC,
};

/// Dispatch table layout
pub use crate::vtable::{Slot, SlotRegion, TypeCache, VTable, VTableBuilder, VTableCache};

//! Reflective model of the input program.
//!
//! The compiler never reads assemblies directly. Everything it knows about types, members,
//! method bodies and literals comes through the [`MetadataProvider`] trait. This module
//! provides that trait, the definition types it hands out, an in-memory implementation
//! ([`ProgramMetadata`]) that can be assembled with [`MetadataBuilder`] or loaded from an XML
//! program description, and the [`NameMangler`] that derives the compiler's identity keys.
//!
//! # Key Components
//!
//! - [`token::Token`] - 32-bit metadata handles as they appear in bytecode operands
//! - [`TypeDef`], [`FieldDef`], [`MethodDef`], [`ConstructorDef`] - owned definitions
//! - [`Callable`] - a method or a constructor
//! - [`MetadataProvider`] - lookups plus derived reflective queries
//! - [`ProgramMetadata`] / [`MetadataBuilder`] - in-memory provider
//! - [`NameMangler`] - mangled names

mod defs;
pub mod flags;
mod loader;
mod mangle;
mod provider;
mod store;
pub mod token;

pub use defs::{Callable, ConstructorDef, FieldDef, MethodBody, MethodDef, ParamDef, TypeDef};
pub use flags::{MethodAccessFlags, MethodModifiers, MethodVtableFlags, ParamFlags, TypeFlags};
pub use mangle::{NameMangler, VOID_TYPE_NAME};
pub use provider::MetadataProvider;
pub use store::{MetadataBuilder, ProgramMetadata};
pub use token::{Token, TokenKind};

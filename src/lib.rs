// Copyright 2025 The cardinal developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # cardinal
//!
//! Front end of an ahead-of-time cross-compiler for CIL bytecode. `cardinal` walks a managed
//! program starting from one or more entry methods, decodes every reachable method body and
//! rewrites it into a single-assignment token graph, and computes the virtual dispatch table
//! layout of every type the walk touches. The results are handed to a native code generator
//! through a compact binary program image.
//!
//! # Architecture
//!
//! The crate is organised in layers, leaves first:
//!
//! - [`metadata`] - the reflective view of the input program ([`metadata::MetadataProvider`]),
//!   an in-memory implementation with a builder and an XML loader, and the name mangler
//! - [`resolver`] - declarative type substitution and native linkage
//! - [`decoder`] - opcode tables and the [`decoder::InstructionStream`] cursor
//! - [`translate`] - operand stack simulation producing [`program::SsaToken`] sequences
//! - [`vtable`] - slot classification, offset assignment and type conversion tables
//! - [`program`] - the output records and their wire format
//! - [`compiler`] - the work-list closure tying everything together
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cardinal::prelude::*;
//!
//! let metadata = ProgramMetadata::from_file("program.xml")?;
//! let config = ResolverConfig::from_file("resolver.xml")?;
//!
//! let mut compiler = Compiler::new(&metadata, config, CompilerOptions::default())?;
//! compiler.add_entry_by_name("Demo.Program", "Main")?;
//! let compilation = compiler.compile()?;
//!
//! ProgramWriter::new(&compilation.records).write_file("program.cself")?;
//! # Ok::<(), cardinal::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns [`Result`]. Failures are fatal for the run that triggers
//! them; there is no partial output mode. See [`Error`] for the taxonomy.

#[macro_use]
pub(crate) mod macros;

pub(crate) mod error;
pub(crate) mod utils;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Reflective model of the input program.
pub mod metadata;

/// Declarative type substitution and native linkage.
pub mod resolver;

/// CIL opcode tables and instruction cursor.
pub mod decoder;

/// Operand stack simulation and token emission.
pub mod translate;

/// Program records and the binary image format.
pub mod program;

/// Virtual dispatch table layout.
pub mod vtable;

/// Whole-program discovery and compilation driver.
pub mod compiler;

/// `cardinal` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;

pub use compiler::{Compilation, Compiler, CompilerOptions};
pub use decoder::InstructionStream;
pub use metadata::{token::Token, MetadataBuilder, MetadataProvider, ProgramMetadata};
pub use program::{ProgramReader, ProgramWriter, Records};
pub use resolver::{ResolverConfig, TypeResolver};

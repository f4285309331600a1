//! Bytecode to SSA token translation.
//!
//! The [`Translator`] simulates the evaluation stack of one method body and emits one
//! [`crate::program::SsaToken`] per instruction. Whole-program discovery is not its concern:
//! every callable and type a body references is handed to a [`Discovery`] implementation,
//! which the compiler backs with its work-list.

mod operation;
mod stack;
mod translator;

pub use operation::{Operation, ValueKind};
pub use stack::OperandStack;
pub use translator::{Discovery, Translation, Translator};

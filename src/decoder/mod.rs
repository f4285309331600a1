//! Bytecode decoding.
//!
//! [`opcodes`] holds the complete opcode table; [`InstructionStream`] walks a method body one
//! instruction at a time and hands out raw operand values for the translator to interpret.

pub mod opcodes;
mod stream;

pub use opcodes::{OpCode, OperandType};
pub use stream::{branch_target, sign_extend, InstructionStream};

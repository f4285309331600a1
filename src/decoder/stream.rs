//! Cursor over a method body's bytecode.
//!
//! [`InstructionStream`] never materialises an instruction list. It exposes the opcode under
//! the cursor together with its decoded operands, and [`InstructionStream::advance`] steps over
//! the complete encoding (opcode, operands and, for `switch`, the jump table).

use crate::{
    decoder::opcodes::{self, OpCode, OperandType, FE_PREFIX},
    utils::read_le_at,
    Error, Result,
};

/// A forward-only cursor over CIL bytecode.
///
/// # Examples
///
/// ```rust
/// use cardinal::InstructionStream;
///
/// // ldc.i4.s -1; ret
/// let code = [0x1F, 0xFF, 0x2A];
/// let mut stream = InstructionStream::new(&code);
///
/// assert_eq!(stream.current_opcode()?.name, "ldc.i4.s");
/// assert_eq!(stream.operand_value(0)?, 0xFF);
/// assert!(stream.advance()?);
/// assert_eq!(stream.offset(), 2);
/// assert!(!stream.advance()?);
/// # Ok::<(), cardinal::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct InstructionStream<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> InstructionStream<'a> {
    /// Creates a cursor positioned at offset 0.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        InstructionStream { data, offset: 0 }
    }

    /// Byte offset of the instruction under the cursor.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// `true` once the cursor has moved past the last instruction.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// The underlying bytecode.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Decodes the opcode under the cursor.
    ///
    /// # Errors
    /// [`Error::TruncatedStream`] if the cursor is exhausted or a `0xFE` prefix is the last
    /// byte, [`Error::UnsupportedOpcode`] for encodings missing from the opcode table.
    pub fn current_opcode(&self) -> Result<OpCode> {
        let first = self.byte_at(self.offset, 1)?;
        if first == FE_PREFIX {
            let second = self.byte_at(self.offset + 1, 2)?;
            return opcodes::lookup_fe(second).ok_or_else(|| Error::UnsupportedOpcode {
                method: String::new(),
                offset: self.offset,
                opcode: format!("0xFE{second:02X}"),
            });
        }

        opcodes::lookup(first).ok_or_else(|| Error::UnsupportedOpcode {
            method: String::new(),
            offset: self.offset,
            opcode: format!("0x{first:02X}"),
        })
    }

    /// Number of inline operands of the current instruction.
    ///
    /// `switch` reports `1 + N`: the target count followed by its `N` displacements.
    ///
    /// # Errors
    /// Propagates decoding errors of [`InstructionStream::current_opcode`].
    pub fn operand_count(&self) -> Result<usize> {
        let opcode = self.current_opcode()?;
        match opcode.operand {
            OperandType::InlineNone => Ok(0),
            OperandType::InlineSwitch => Ok(1 + self.switch_count(&opcode)? as usize),
            _ => Ok(1),
        }
    }

    /// Byte width of operand `index`, or 0 if the instruction has no such operand.
    ///
    /// # Errors
    /// Propagates decoding errors of [`InstructionStream::current_opcode`].
    pub fn operand_size(&self, index: usize) -> Result<usize> {
        if index >= self.operand_count()? {
            return Ok(0);
        }
        Ok(self.current_opcode()?.operand.size())
    }

    /// Raw little-endian value of operand `index`, zero-extended to 64 bits.
    ///
    /// Signed interpretation (branch displacements, `ldc.i4.s`) is up to the caller, who
    /// knows the operand width from [`InstructionStream::operand_size`]. An index past the
    /// last operand yields 0.
    ///
    /// # Errors
    /// [`Error::TruncatedStream`] if the operand extends past the end of the buffer.
    pub fn operand_value(&self, index: usize) -> Result<u64> {
        let opcode = self.current_opcode()?;
        if index >= self.operand_count()? {
            return Ok(0);
        }

        let width = opcode.operand.size();
        let start = self.offset + opcode.size() + index * width;
        self.read_unsigned(start, width)
    }

    /// Total encoded size of the current instruction.
    ///
    /// # Errors
    /// Propagates decoding errors of [`InstructionStream::current_opcode`].
    pub fn instruction_size(&self) -> Result<usize> {
        let opcode = self.current_opcode()?;
        let operands = self.operand_count()?;
        Ok(opcode.size() + operands * opcode.operand.size())
    }

    /// Moves the cursor past the current instruction.
    ///
    /// Returns `true` while another instruction follows.
    ///
    /// # Errors
    /// [`Error::TruncatedStream`] if the instruction's encoding does not fit in the buffer.
    pub fn advance(&mut self) -> Result<bool> {
        let size = self.instruction_size()?;
        let end = self.offset + size;
        if end > self.data.len() {
            return Err(Error::TruncatedStream {
                offset: self.offset,
                needed: size,
                available: self.data.len() - self.offset,
            });
        }

        self.offset = end;
        Ok(!self.is_exhausted())
    }

    fn switch_count(&self, opcode: &OpCode) -> Result<u32> {
        let value = self.read_unsigned(self.offset + opcode.size(), 4)?;
        Ok(value as u32)
    }

    fn byte_at(&self, position: usize, needed: usize) -> Result<u8> {
        self.data
            .get(position)
            .copied()
            .ok_or_else(|| Error::TruncatedStream {
                offset: self.offset,
                needed,
                available: self.data.len().saturating_sub(self.offset),
            })
    }

    fn read_unsigned(&self, start: usize, width: usize) -> Result<u64> {
        let mut cursor = start;
        let value = match width {
            1 => read_le_at::<u8>(self.data, &mut cursor).map(u64::from),
            2 => read_le_at::<u16>(self.data, &mut cursor).map(u64::from),
            4 => read_le_at::<u32>(self.data, &mut cursor).map(u64::from),
            8 => read_le_at::<u64>(self.data, &mut cursor),
            _ => Some(0),
        };

        value.ok_or_else(|| Error::TruncatedStream {
            offset: self.offset,
            needed: start + width - self.offset,
            available: self.data.len().saturating_sub(self.offset),
        })
    }
}

/// Sign-extends the low `width` bytes of `value`.
#[must_use]
pub fn sign_extend(value: u64, width: usize) -> i64 {
    match width {
        1 => i64::from(value as u8 as i8),
        2 => i64::from(value as u16 as i16),
        4 => i64::from(value as u32 as i32),
        _ => value as i64,
    }
}

/// Absolute target of a relative branch.
///
/// `displacement` is the raw operand of `width` bytes; the target is relative to the first
/// byte after the instruction, i.e. `offset + opcode_size + width`.
#[must_use]
pub fn branch_target(offset: usize, opcode_size: usize, width: usize, displacement: u64) -> i64 {
    sign_extend(displacement, width) + (offset + opcode_size + width) as i64
}

//! Operand stack simulation.
//!
//! [`Translator`] walks one method body with an [`InstructionStream`] and rewrites every
//! instruction into an [`SsaToken`] whose `parameters` name the tokens that produced its
//! inputs. Inputs are popped top-of-stack first, so binary operations record
//! `[right, left]` and stores record `[value, target...]`. Calls and constructions pop their
//! arguments as a block and record them in left-to-right parameter order.
//!
//! Referenced callables and types are reported through [`Discovery`]; the translator never
//! recurses into another body itself.

use crate::{
    decoder::{branch_target, opcodes as op, sign_extend, InstructionStream, OpCode},
    metadata::{Callable, NameMangler, Token, TokenKind},
    program::SsaToken,
    resolver::TypeResolver,
    translate::{Operation, OperandStack, ValueKind},
    Error, Result,
};

/// Receives every entity a body references.
///
/// Implementations must make repeated requests cheap no-ops; the translator reports each
/// reference as it encounters it.
pub trait Discovery {
    /// A resolved, non-native callable is invoked, constructed through or referenced.
    ///
    /// # Errors
    /// Implementations may fail on lookup errors.
    fn request_callable(&mut self, callable: &Callable) -> Result<()>;

    /// A type is referenced by a type operand or a field access.
    ///
    /// # Errors
    /// Implementations may fail on lookup errors.
    fn request_type(&mut self, ty: Token) -> Result<()>;

    /// A native callable is referenced under its mangled name.
    fn register_native(&mut self, name: String, symbol: String);
}

/// Output of a translated body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    /// Tokens in decode order
    pub tokens: Vec<SsaToken>,
    /// String pool
    pub strings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct PendingConstraint {
    ty: u64,
    offset: usize,
}

/// Translates a single method body.
pub struct Translator<'r, 'm> {
    resolver: &'r TypeResolver<'m>,
    method: String,
    stack: OperandStack,
    output: Translation,
    next_id: u32,
    constrained: Option<PendingConstraint>,
}

impl<'r, 'm> Translator<'r, 'm> {
    /// Creates a translator for the method called `method` (used in diagnostics).
    #[must_use]
    pub fn new(resolver: &'r TypeResolver<'m>, method: impl Into<String>) -> Self {
        Translator {
            resolver,
            method: method.into(),
            stack: OperandStack::new(),
            output: Translation::default(),
            next_id: 0,
            constrained: None,
        }
    }

    /// Translates `code` from offset 0 until the stream is exhausted.
    ///
    /// # Errors
    /// Fails on truncated or unknown instructions, opcodes without a translation rule, stack
    /// imbalance, a dangling `constrained.` prefix, and on lookup errors reported by the
    /// metadata, the resolver or `discovery`.
    pub fn translate(mut self, code: &[u8], discovery: &mut dyn Discovery) -> Result<Translation> {
        let mut stream = InstructionStream::new(code);

        while !stream.is_exhausted() {
            self.step(&stream, discovery)
                .map_err(|error| error.in_method(&self.method))?;
            stream.advance()?;
        }

        if let Some(pending) = self.constrained {
            return Err(Error::ConstrainedPrefix {
                method: self.method,
                offset: pending.offset,
            });
        }

        log::trace!(
            "Translated {}: {} tokens, {} strings",
            self.method,
            self.output.tokens.len(),
            self.output.strings.len()
        );
        Ok(self.output)
    }

    fn step(&mut self, stream: &InstructionStream<'_>, discovery: &mut dyn Discovery) -> Result<()> {
        let opcode = stream.current_opcode()?;
        let offset = stream.offset();

        if let Some(pending) = self.constrained {
            if opcode.value != op::CALLVIRT {
                return Err(Error::ConstrainedPrefix {
                    method: self.method.clone(),
                    offset: pending.offset,
                });
            }
        }

        match opcode.value {
            op::NOP => self.apply(offset, Operation::Nop, 0, false, vec![]),

            op::LDARG_0..=op::LDARG_3 => {
                let index = u64::from(opcode.value - op::LDARG_0);
                self.apply(offset, Operation::LoadArgument, 0, true, vec![index])
            }
            op::LDLOC_0..=op::LDLOC_3 => {
                let index = u64::from(opcode.value - op::LDLOC_0);
                self.apply(offset, Operation::LoadLocal, 0, true, vec![index])
            }
            op::STLOC_0..=op::STLOC_3 => {
                let index = u64::from(opcode.value - op::STLOC_0);
                self.apply(offset, Operation::StoreLocal, 1, false, vec![index])
            }
            op::LDARG_S | op::LDARG => {
                self.apply_operand(stream, Operation::LoadArgument, 0, true)
            }
            op::LDARGA_S | op::LDARGA => {
                self.apply_operand(stream, Operation::LoadArgumentAddress, 0, true)
            }
            op::STARG_S | op::STARG => {
                self.apply_operand(stream, Operation::StoreArgument, 1, false)
            }
            op::LDLOC_S | op::LDLOC => self.apply_operand(stream, Operation::LoadLocal, 0, true),
            op::LDLOCA_S | op::LDLOCA => {
                self.apply_operand(stream, Operation::LoadLocalAddress, 0, true)
            }
            op::STLOC_S | op::STLOC => self.apply_operand(stream, Operation::StoreLocal, 1, false),

            op::LDNULL => self.apply(offset, Operation::LoadNull, 0, true, vec![]),
            op::LDC_I4_M1..=op::LDC_I4_S | op::LDC_I4..=op::LDC_R8 => {
                let constants = self.load_constant(stream, opcode)?;
                self.apply(offset, Operation::LoadConstant, 0, true, constants)
            }
            op::LDSTR => self.load_string(stream),
            op::LDTOKEN => {
                let token = stream.operand_value(0)?;
                if Token::new(token as u32).kind() == Some(TokenKind::TypeDef) {
                    discovery.request_type(Token::new(token as u32))?;
                }
                self.apply(offset, Operation::LoadToken, 0, true, vec![token])
            }

            op::DUP => {
                let producer = self.pop(offset)?;
                let token = self.next_token(offset, Operation::Duplicate);
                self.output.tokens.push(token.with_parameters(vec![producer]));
                self.stack.push(producer);
                self.stack.push(producer);
                Ok(())
            }
            op::POP => self.apply(offset, Operation::Pop, 1, false, vec![]),
            op::THROW => self.apply(offset, Operation::Throw, 1, false, vec![]),
            op::RETHROW => self.apply(offset, Operation::Rethrow, 0, false, vec![]),
            op::RET => self.ret(offset),

            op::BR_S..=op::BLT_UN_S | op::BR..=op::BLT_UN | op::LEAVE | op::LEAVE_S => {
                self.branch(stream, opcode)
            }
            op::SWITCH => self.switch(stream),
            op::ENDFINALLY => {
                self.stack.clear();
                self.apply(offset, Operation::EndFinally, 0, false, vec![])
            }
            op::ENDFILTER => self.apply(offset, Operation::EndFilter, 1, false, vec![]),

            op::ADD => self.apply(offset, Operation::Add, 2, true, vec![]),
            op::ADD_OVF => self.apply(offset, Operation::AddCheckOverflow, 2, true, vec![]),
            op::ADD_OVF_UN => self.apply(offset, Operation::UAddCheckOverflow, 2, true, vec![]),
            op::SUB => self.apply(offset, Operation::Subtract, 2, true, vec![]),
            op::SUB_OVF => self.apply(offset, Operation::SubtractCheckOverflow, 2, true, vec![]),
            op::SUB_OVF_UN => {
                self.apply(offset, Operation::USubtractCheckOverflow, 2, true, vec![])
            }
            op::MUL => self.apply(offset, Operation::Multiply, 2, true, vec![]),
            op::MUL_OVF => self.apply(offset, Operation::MultiplyCheckOverflow, 2, true, vec![]),
            op::MUL_OVF_UN => {
                self.apply(offset, Operation::UMultiplyCheckOverflow, 2, true, vec![])
            }
            op::DIV => self.apply(offset, Operation::Divide, 2, true, vec![]),
            op::DIV_UN => self.apply(offset, Operation::UDivide, 2, true, vec![]),
            op::REM => self.apply(offset, Operation::Remainder, 2, true, vec![]),
            op::REM_UN => self.apply(offset, Operation::URemainder, 2, true, vec![]),
            op::AND => self.apply(offset, Operation::And, 2, true, vec![]),
            op::OR => self.apply(offset, Operation::Or, 2, true, vec![]),
            op::XOR => self.apply(offset, Operation::Xor, 2, true, vec![]),
            op::SHL => self.apply(offset, Operation::ShiftLeft, 2, true, vec![]),
            op::SHR => self.apply(offset, Operation::ShiftRight, 2, true, vec![]),
            op::SHR_UN => self.apply(offset, Operation::UShiftRight, 2, true, vec![]),
            op::NEG => self.apply(offset, Operation::Negate, 1, true, vec![]),
            op::NOT => self.apply(offset, Operation::Not, 1, true, vec![]),

            op::CEQ => self.apply(offset, Operation::CompareEqual, 2, true, vec![]),
            op::CGT => self.apply(offset, Operation::CompareGreater, 2, true, vec![]),
            op::CGT_UN => self.apply(offset, Operation::UCompareGreater, 2, true, vec![]),
            op::CLT => self.apply(offset, Operation::CompareLess, 2, true, vec![]),
            op::CLT_UN => self.apply(offset, Operation::UCompareLess, 2, true, vec![]),

            op::CONV_I1..=op::CONV_U8
            | op::CONV_R_UN
            | op::CONV_U2..=op::CONV_I
            | op::CONV_U
            | op::CONV_OVF_I1..=op::CONV_OVF_U8
            | op::CONV_OVF_I
            | op::CONV_OVF_U
            | op::CONV_OVF_I1_UN..=op::CONV_OVF_U_UN => self.convert(offset, opcode),

            op::LDIND_I1..=op::LDIND_REF => {
                let kind = self.kind_of(offset, opcode)?;
                self.apply(offset, Operation::LoadIndirect, 1, true, vec![kind])
            }
            op::STIND_REF..=op::STIND_R8 | op::STIND_I => {
                let kind = self.kind_of(offset, opcode)?;
                self.apply(offset, Operation::StoreIndirect, 2, false, vec![kind])
            }
            op::LDELEM_I1..=op::LDELEM_REF => {
                let kind = self.kind_of(offset, opcode)?;
                self.apply(offset, Operation::LoadElement, 2, true, vec![kind])
            }
            op::STELEM_I..=op::STELEM_REF => {
                let kind = self.kind_of(offset, opcode)?;
                self.apply(offset, Operation::StoreElement, 3, false, vec![kind])
            }
            op::LDELEM => self.typed(stream, discovery, Operation::LoadElement, 2, true, true),
            op::LDELEMA => {
                self.typed(stream, discovery, Operation::LoadElementAddress, 2, true, true)
            }
            op::STELEM => self.typed(stream, discovery, Operation::StoreElement, 3, false, true),
            op::LDLEN => self.apply(offset, Operation::LoadLength, 1, true, vec![]),

            op::LDFLD => self.field(stream, discovery, Operation::LoadField, 1, true),
            op::LDFLDA => self.field(stream, discovery, Operation::LoadFieldAddress, 1, true),
            op::STFLD => self.field(stream, discovery, Operation::StoreField, 2, false),
            op::LDSFLD => self.field(stream, discovery, Operation::LoadStaticField, 0, true),
            op::LDSFLDA => {
                self.field(stream, discovery, Operation::LoadStaticFieldAddress, 0, true)
            }
            op::STSFLD => self.field(stream, discovery, Operation::StoreStaticField, 1, false),

            op::LDOBJ => self.typed(stream, discovery, Operation::LoadObject, 1, true, false),
            op::STOBJ => self.typed(stream, discovery, Operation::StoreObject, 2, false, false),
            op::INITOBJ => self.typed(stream, discovery, Operation::InitObject, 1, false, false),
            op::SIZEOF => self.typed(stream, discovery, Operation::SizeOf, 0, true, false),
            op::ISINST => self.typed(stream, discovery, Operation::IsInstance, 1, true, false),
            op::CASTCLASS => self.typed(stream, discovery, Operation::CastClass, 1, true, false),
            op::BOX => self.typed(stream, discovery, Operation::Box, 1, true, false),
            op::UNBOX_ANY => self.typed(stream, discovery, Operation::UnboxAny, 1, true, false),
            op::NEWARR => self.new_array(stream, discovery),
            op::LOCALLOC => self.apply(offset, Operation::LocalAlloc, 1, true, vec![]),
            op::CPBLK => self.apply(offset, Operation::CopyBlock, 3, false, vec![]),
            op::INITBLK => self.apply(offset, Operation::InitBlock, 3, false, vec![]),

            op::CALL | op::CALLVIRT => self.call(stream, opcode, discovery),
            op::NEWOBJ => self.new_object(stream, discovery),
            op::LDFTN => self.reference(stream, discovery, Operation::LoadFunction, true),
            op::JMP => self.reference(stream, discovery, Operation::Jump, false),
            op::CONSTRAINED => {
                self.constrained = Some(PendingConstraint {
                    ty: stream.operand_value(0)?,
                    offset,
                });
                Ok(())
            }

            _ => Err(Error::UnsupportedOpcode {
                method: self.method.clone(),
                offset,
                opcode: opcode.name.to_string(),
            }),
        }
    }

    fn next_token(&mut self, offset: usize, operation: Operation) -> SsaToken {
        let id = self.next_id;
        self.next_id += 1;
        SsaToken::new(id, offset as u32, operation)
    }

    fn pop(&mut self, offset: usize) -> Result<u32> {
        self.stack.pop().ok_or_else(|| Error::StackImbalance {
            method: self.method.clone(),
            offset,
            message: "pop from an empty operand stack".to_string(),
        })
    }

    /// Pops `count` values, top of stack first.
    fn pop_inputs(&mut self, count: usize, offset: usize) -> Result<Vec<u32>> {
        (0..count).map(|_| self.pop(offset)).collect()
    }

    /// Pops `count` call arguments and returns them in parameter order.
    fn pop_arguments(&mut self, count: usize, offset: usize) -> Result<Vec<u32>> {
        let available = self.stack.len();
        self.stack
            .pop_many(count)
            .ok_or_else(|| Error::StackImbalance {
                method: self.method.clone(),
                offset,
                message: format!("call needs {count} arguments, {available} on the stack"),
            })
    }

    /// The common rule: pop `pops` inputs, emit one token, push it if it `produces` a value.
    fn apply(
        &mut self,
        offset: usize,
        operation: Operation,
        pops: usize,
        produces: bool,
        constants: Vec<u64>,
    ) -> Result<()> {
        let inputs = self.pop_inputs(pops, offset)?;
        let token = self
            .next_token(offset, operation)
            .with_parameters(inputs)
            .with_constants(constants);
        self.emit(token, produces);
        Ok(())
    }

    fn emit(&mut self, token: SsaToken, produces: bool) {
        if produces {
            self.stack.push(token.id);
        }
        self.output.tokens.push(token);
    }

    /// Variable-index forms carry the index as their only operand.
    fn apply_operand(
        &mut self,
        stream: &InstructionStream<'_>,
        operation: Operation,
        pops: usize,
        produces: bool,
    ) -> Result<()> {
        let index = stream.operand_value(0)?;
        self.apply(stream.offset(), operation, pops, produces, vec![index])
    }

    fn kind_of(&self, offset: usize, opcode: OpCode) -> Result<u64> {
        ValueKind::from_mnemonic(opcode.name)
            .map(ValueKind::constant)
            .ok_or_else(|| Error::UnsupportedOpcode {
                method: self.method.clone(),
                offset,
                opcode: opcode.name.to_string(),
            })
    }

    fn load_constant(&self, stream: &InstructionStream<'_>, opcode: OpCode) -> Result<Vec<u64>> {
        let (kind, value) = match opcode.value {
            op::LDC_I4_M1..=op::LDC_I4_8 => {
                let value = i64::from(opcode.value) - i64::from(op::LDC_I4_0);
                (ValueKind::I4, value as u64)
            }
            op::LDC_I4_S => (ValueKind::I4, sign_extend(stream.operand_value(0)?, 1) as u64),
            op::LDC_I4 => (ValueKind::I4, sign_extend(stream.operand_value(0)?, 4) as u64),
            op::LDC_I8 => (ValueKind::I8, stream.operand_value(0)?),
            op::LDC_R4 => (ValueKind::R4, stream.operand_value(0)?),
            _ => (ValueKind::R8, stream.operand_value(0)?),
        };
        Ok(vec![kind.constant(), value])
    }

    fn load_string(&mut self, stream: &InstructionStream<'_>) -> Result<()> {
        let literal = self
            .resolver
            .metadata()
            .user_string(Token::new(stream.operand_value(0)? as u32))?;

        let index = self.output.strings.len() as u64;
        self.output.strings.push(literal.clone());

        let token = self
            .next_token(stream.offset(), Operation::LoadString)
            .with_constants(vec![index])
            .with_string(literal);
        self.emit(token, true);
        Ok(())
    }

    fn ret(&mut self, offset: usize) -> Result<()> {
        let mut token = self.next_token(offset, Operation::Return);
        if let Some(value) = self.stack.pop() {
            token.parameters.push(value);
        }

        if !self.stack.is_empty() {
            return Err(Error::StackImbalance {
                method: self.method.clone(),
                offset,
                message: format!(
                    "{} values left on the operand stack at return",
                    self.stack.len()
                ),
            });
        }

        self.output.tokens.push(token);
        Ok(())
    }

    fn branch(&mut self, stream: &InstructionStream<'_>, opcode: OpCode) -> Result<()> {
        let offset = stream.offset();
        let (operation, pops) = match opcode.value {
            op::BR_S | op::BR => (Operation::Branch, 0),
            op::BRFALSE_S | op::BRFALSE => (Operation::BranchFalse, 1),
            op::BRTRUE_S | op::BRTRUE => (Operation::BranchTrue, 1),
            op::BEQ_S | op::BEQ => (Operation::BranchEqual, 2),
            op::BGE_S | op::BGE => (Operation::BranchGreaterOrEqual, 2),
            op::BGT_S | op::BGT => (Operation::BranchGreater, 2),
            op::BLE_S | op::BLE => (Operation::BranchLessOrEqual, 2),
            op::BLT_S | op::BLT => (Operation::BranchLess, 2),
            op::BNE_UN_S | op::BNE_UN => (Operation::UBranchNotEqual, 2),
            op::BGE_UN_S | op::BGE_UN => (Operation::UBranchGreaterOrEqual, 2),
            op::BGT_UN_S | op::BGT_UN => (Operation::UBranchGreater, 2),
            op::BLE_UN_S | op::BLE_UN => (Operation::UBranchLessOrEqual, 2),
            op::BLT_UN_S | op::BLT_UN => (Operation::UBranchLess, 2),
            _ => {
                self.stack.clear();
                (Operation::Leave, 0)
            }
        };

        let width = stream.operand_size(0)?;
        let target = branch_target(offset, opcode.size(), width, stream.operand_value(0)?);
        self.apply(offset, operation, pops, false, vec![target as u64])
    }

    fn switch(&mut self, stream: &InstructionStream<'_>) -> Result<()> {
        let offset = stream.offset();
        let count = stream.operand_count()?;
        let table_end = offset + stream.instruction_size()?;

        let targets = (1..count)
            .map(|index| {
                let displacement = sign_extend(stream.operand_value(index)?, 4);
                Ok((displacement + table_end as i64) as u64)
            })
            .collect::<Result<Vec<_>>>()?;

        self.apply(offset, Operation::Switch, 1, false, targets)
    }

    fn convert(&mut self, offset: usize, opcode: OpCode) -> Result<()> {
        let operation = if !opcode.name.starts_with("conv.ovf.") {
            Operation::Convert
        } else if opcode.name.ends_with(".un") {
            Operation::ConvertCheckOverflowUn
        } else {
            Operation::ConvertCheckOverflow
        };

        let kind = self.kind_of(offset, opcode)?;
        self.apply(offset, operation, 1, true, vec![kind])
    }

    /// Instructions with a type operand. `element_form` prefixes the `Object` kind so typed
    /// element access reads like the sized forms.
    fn typed(
        &mut self,
        stream: &InstructionStream<'_>,
        discovery: &mut dyn Discovery,
        operation: Operation,
        pops: usize,
        produces: bool,
        element_form: bool,
    ) -> Result<()> {
        let ty = stream.operand_value(0)?;
        discovery.request_type(Token::new(ty as u32))?;

        let constants = if element_form {
            vec![ValueKind::Object.constant(), ty]
        } else {
            vec![ty]
        };
        self.apply(stream.offset(), operation, pops, produces, constants)
    }

    fn field(
        &mut self,
        stream: &InstructionStream<'_>,
        discovery: &mut dyn Discovery,
        operation: Operation,
        pops: usize,
        produces: bool,
    ) -> Result<()> {
        let token = stream.operand_value(0)?;
        let field = self.resolver.metadata().field(Token::new(token as u32))?;
        discovery.request_type(field.declaring)?;

        self.apply(stream.offset(), operation, pops, produces, vec![token])
    }

    fn new_array(
        &mut self,
        stream: &InstructionStream<'_>,
        discovery: &mut dyn Discovery,
    ) -> Result<()> {
        let offset = stream.offset();
        let element = stream.operand_value(0)?;
        let element_token = Token::new(element as u32);
        discovery.request_type(element_token)?;

        let name = NameMangler::type_name(self.resolver.metadata(), element_token, false)?;
        let length = self.pop(offset)?;
        let token = self
            .next_token(offset, Operation::NewArray)
            .with_parameters(vec![length])
            .with_constants(vec![element])
            .with_string(name);
        self.emit(token, true);
        Ok(())
    }

    /// Resolves a callable reference and reports it: natives are registered under their
    /// mangled name, everything else is requested for translation.
    fn reference_callable(
        &mut self,
        declared: &Callable,
        discovery: &mut dyn Discovery,
    ) -> Result<(Callable, String)> {
        let resolved = self.resolver.resolve_callable(declared)?;
        let name = NameMangler::mangle_callable(self.resolver.metadata(), &resolved)?;

        match self.resolver.native_name(&resolved)? {
            Some(symbol) => {
                log::debug!("{name} is native, bound to '{symbol}'");
                discovery.register_native(name.clone(), symbol);
            }
            None => discovery.request_callable(&resolved)?,
        }
        Ok((resolved, name))
    }

    fn call(
        &mut self,
        stream: &InstructionStream<'_>,
        opcode: OpCode,
        discovery: &mut dyn Discovery,
    ) -> Result<()> {
        let offset = stream.offset();
        let token = stream.operand_value(0)?;
        let declared = self.resolver.metadata().callable(Token::new(token as u32))?;
        let (target, name) = self.reference_callable(&declared, discovery)?;

        let arguments = self.pop_arguments(target.stack_inputs(), offset)?;
        let (operation, constants) = match (opcode.value, self.constrained.take()) {
            (op::CALLVIRT, Some(pending)) => {
                (Operation::CallVirtualConstrained, vec![token, pending.ty])
            }
            (op::CALLVIRT, None) => (Operation::CallVirtual, vec![token]),
            _ => (Operation::Call, vec![token]),
        };

        let token = self
            .next_token(offset, operation)
            .with_parameters(arguments)
            .with_constants(constants)
            .with_string(name);
        self.emit(token, target.returns().is_some());
        Ok(())
    }

    fn new_object(
        &mut self,
        stream: &InstructionStream<'_>,
        discovery: &mut dyn Discovery,
    ) -> Result<()> {
        let offset = stream.offset();
        let token = stream.operand_value(0)?;
        let metadata = self.resolver.metadata();
        let declared = metadata.callable(Token::new(token as u32))?;
        if !declared.is_constructor() {
            return Err(Error::InvalidToken {
                token: Token::new(token as u32),
                expected: "constructor",
            });
        }

        let type_name = NameMangler::type_name(metadata, declared.declaring(), false)?;
        let (constructor, name) = self.reference_callable(&declared, discovery)?;
        let arguments = self.pop_arguments(constructor.params().len(), offset)?;

        let index = self.output.strings.len() as u64;
        self.output.strings.push(name);

        let token = self
            .next_token(offset, Operation::NewObject)
            .with_parameters(arguments)
            .with_constants(vec![token, index])
            .with_string(type_name);
        self.emit(token, true);
        Ok(())
    }

    /// `ldftn` and `jmp`: reference a callable without consuming arguments.
    fn reference(
        &mut self,
        stream: &InstructionStream<'_>,
        discovery: &mut dyn Discovery,
        operation: Operation,
        produces: bool,
    ) -> Result<()> {
        let token = stream.operand_value(0)?;
        let declared = self.resolver.metadata().callable(Token::new(token as u32))?;
        let (_, name) = self.reference_callable(&declared, discovery)?;

        let token = self
            .next_token(stream.offset(), operation)
            .with_constants(vec![token])
            .with_string(name);
        self.emit(token, produces);
        Ok(())
    }
}

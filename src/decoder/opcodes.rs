//! CIL opcode table (ECMA-335 Partition III).
//!
//! Every opcode is listed once with its encoding, mnemonic and operand kind. The list expands
//! into a `u16` constant per opcode and into the lookup tables used by
//! [`crate::decoder::InstructionStream`]. Single-byte opcodes have values `0x00..=0xE0`;
//! two-byte opcodes are stored as `0xFE00 | second_byte`, so both spaces share one match arm
//! namespace in the translator.
#![allow(missing_docs)]

use std::sync::OnceLock;

use strum::Display;

/// Escape byte selecting the two-byte opcode space.
pub const FE_PREFIX: u8 = 0xFE;

/// Kind of the inline operand that follows an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OperandType {
    /// No operand
    InlineNone,
    /// 1-byte argument or local index
    ShortInlineVar,
    /// 2-byte argument or local index
    InlineVar,
    /// 1-byte signed integer
    ShortInlineI,
    /// 4-byte signed integer
    InlineI,
    /// 8-byte signed integer
    InlineI8,
    /// 4-byte IEEE float
    ShortInlineR,
    /// 8-byte IEEE float
    InlineR,
    /// 1-byte signed branch displacement
    ShortInlineBrTarget,
    /// 4-byte signed branch displacement
    InlineBrTarget,
    /// 4-byte count followed by that many 4-byte displacements
    InlineSwitch,
    /// Method or constructor token
    InlineMethod,
    /// Field token
    InlineField,
    /// Type token
    InlineType,
    /// String literal token
    InlineString,
    /// Type, field or method token
    InlineTok,
    /// Stand-alone signature token
    InlineSig,
}

impl OperandType {
    /// Byte width of the operand; for [`OperandType::InlineSwitch`] the width of one entry.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            OperandType::InlineNone => 0,
            OperandType::ShortInlineVar
            | OperandType::ShortInlineI
            | OperandType::ShortInlineBrTarget => 1,
            OperandType::InlineVar => 2,
            OperandType::InlineI8 | OperandType::InlineR => 8,
            _ => 4,
        }
    }

    /// `true` for branch displacements, which are signed and relative.
    #[must_use]
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            OperandType::ShortInlineBrTarget | OperandType::InlineBrTarget
        )
    }
}

/// One entry of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCode {
    /// Encoding: `0x00..=0xFF`, or `0xFE00 | b` for the two-byte space
    pub value: u16,
    /// Mnemonic, e.g. `"ldc.i4.s"`
    pub name: &'static str,
    /// Inline operand kind
    pub operand: OperandType,
}

impl OpCode {
    /// Encoded size of the opcode itself (1 or 2 bytes).
    #[must_use]
    pub fn size(&self) -> usize {
        if self.value > 0xFF {
            2
        } else {
            1
        }
    }
}

macro_rules! opcodes {
    ($($ident:ident = $value:literal, $name:literal, $operand:ident;)*) => {
        $(
            #[doc = concat!("`", $name, "`")]
            pub const $ident: u16 = $value;
        )*

        static OPCODES: &[OpCode] = &[
            $(OpCode { value: $value, name: $name, operand: OperandType::$operand },)*
        ];
    };
}

opcodes! {
    NOP = 0x00, "nop", InlineNone;
    BREAK = 0x01, "break", InlineNone;
    LDARG_0 = 0x02, "ldarg.0", InlineNone;
    LDARG_1 = 0x03, "ldarg.1", InlineNone;
    LDARG_2 = 0x04, "ldarg.2", InlineNone;
    LDARG_3 = 0x05, "ldarg.3", InlineNone;
    LDLOC_0 = 0x06, "ldloc.0", InlineNone;
    LDLOC_1 = 0x07, "ldloc.1", InlineNone;
    LDLOC_2 = 0x08, "ldloc.2", InlineNone;
    LDLOC_3 = 0x09, "ldloc.3", InlineNone;
    STLOC_0 = 0x0A, "stloc.0", InlineNone;
    STLOC_1 = 0x0B, "stloc.1", InlineNone;
    STLOC_2 = 0x0C, "stloc.2", InlineNone;
    STLOC_3 = 0x0D, "stloc.3", InlineNone;
    LDARG_S = 0x0E, "ldarg.s", ShortInlineVar;
    LDARGA_S = 0x0F, "ldarga.s", ShortInlineVar;
    STARG_S = 0x10, "starg.s", ShortInlineVar;
    LDLOC_S = 0x11, "ldloc.s", ShortInlineVar;
    LDLOCA_S = 0x12, "ldloca.s", ShortInlineVar;
    STLOC_S = 0x13, "stloc.s", ShortInlineVar;
    LDNULL = 0x14, "ldnull", InlineNone;
    LDC_I4_M1 = 0x15, "ldc.i4.m1", InlineNone;
    LDC_I4_0 = 0x16, "ldc.i4.0", InlineNone;
    LDC_I4_1 = 0x17, "ldc.i4.1", InlineNone;
    LDC_I4_2 = 0x18, "ldc.i4.2", InlineNone;
    LDC_I4_3 = 0x19, "ldc.i4.3", InlineNone;
    LDC_I4_4 = 0x1A, "ldc.i4.4", InlineNone;
    LDC_I4_5 = 0x1B, "ldc.i4.5", InlineNone;
    LDC_I4_6 = 0x1C, "ldc.i4.6", InlineNone;
    LDC_I4_7 = 0x1D, "ldc.i4.7", InlineNone;
    LDC_I4_8 = 0x1E, "ldc.i4.8", InlineNone;
    LDC_I4_S = 0x1F, "ldc.i4.s", ShortInlineI;
    LDC_I4 = 0x20, "ldc.i4", InlineI;
    LDC_I8 = 0x21, "ldc.i8", InlineI8;
    LDC_R4 = 0x22, "ldc.r4", ShortInlineR;
    LDC_R8 = 0x23, "ldc.r8", InlineR;
    DUP = 0x25, "dup", InlineNone;
    POP = 0x26, "pop", InlineNone;
    JMP = 0x27, "jmp", InlineMethod;
    CALL = 0x28, "call", InlineMethod;
    CALLI = 0x29, "calli", InlineSig;
    RET = 0x2A, "ret", InlineNone;
    BR_S = 0x2B, "br.s", ShortInlineBrTarget;
    BRFALSE_S = 0x2C, "brfalse.s", ShortInlineBrTarget;
    BRTRUE_S = 0x2D, "brtrue.s", ShortInlineBrTarget;
    BEQ_S = 0x2E, "beq.s", ShortInlineBrTarget;
    BGE_S = 0x2F, "bge.s", ShortInlineBrTarget;
    BGT_S = 0x30, "bgt.s", ShortInlineBrTarget;
    BLE_S = 0x31, "ble.s", ShortInlineBrTarget;
    BLT_S = 0x32, "blt.s", ShortInlineBrTarget;
    BNE_UN_S = 0x33, "bne.un.s", ShortInlineBrTarget;
    BGE_UN_S = 0x34, "bge.un.s", ShortInlineBrTarget;
    BGT_UN_S = 0x35, "bgt.un.s", ShortInlineBrTarget;
    BLE_UN_S = 0x36, "ble.un.s", ShortInlineBrTarget;
    BLT_UN_S = 0x37, "blt.un.s", ShortInlineBrTarget;
    BR = 0x38, "br", InlineBrTarget;
    BRFALSE = 0x39, "brfalse", InlineBrTarget;
    BRTRUE = 0x3A, "brtrue", InlineBrTarget;
    BEQ = 0x3B, "beq", InlineBrTarget;
    BGE = 0x3C, "bge", InlineBrTarget;
    BGT = 0x3D, "bgt", InlineBrTarget;
    BLE = 0x3E, "ble", InlineBrTarget;
    BLT = 0x3F, "blt", InlineBrTarget;
    BNE_UN = 0x40, "bne.un", InlineBrTarget;
    BGE_UN = 0x41, "bge.un", InlineBrTarget;
    BGT_UN = 0x42, "bgt.un", InlineBrTarget;
    BLE_UN = 0x43, "ble.un", InlineBrTarget;
    BLT_UN = 0x44, "blt.un", InlineBrTarget;
    SWITCH = 0x45, "switch", InlineSwitch;
    LDIND_I1 = 0x46, "ldind.i1", InlineNone;
    LDIND_U1 = 0x47, "ldind.u1", InlineNone;
    LDIND_I2 = 0x48, "ldind.i2", InlineNone;
    LDIND_U2 = 0x49, "ldind.u2", InlineNone;
    LDIND_I4 = 0x4A, "ldind.i4", InlineNone;
    LDIND_U4 = 0x4B, "ldind.u4", InlineNone;
    LDIND_I8 = 0x4C, "ldind.i8", InlineNone;
    LDIND_I = 0x4D, "ldind.i", InlineNone;
    LDIND_R4 = 0x4E, "ldind.r4", InlineNone;
    LDIND_R8 = 0x4F, "ldind.r8", InlineNone;
    LDIND_REF = 0x50, "ldind.ref", InlineNone;
    STIND_REF = 0x51, "stind.ref", InlineNone;
    STIND_I1 = 0x52, "stind.i1", InlineNone;
    STIND_I2 = 0x53, "stind.i2", InlineNone;
    STIND_I4 = 0x54, "stind.i4", InlineNone;
    STIND_I8 = 0x55, "stind.i8", InlineNone;
    STIND_R4 = 0x56, "stind.r4", InlineNone;
    STIND_R8 = 0x57, "stind.r8", InlineNone;
    ADD = 0x58, "add", InlineNone;
    SUB = 0x59, "sub", InlineNone;
    MUL = 0x5A, "mul", InlineNone;
    DIV = 0x5B, "div", InlineNone;
    DIV_UN = 0x5C, "div.un", InlineNone;
    REM = 0x5D, "rem", InlineNone;
    REM_UN = 0x5E, "rem.un", InlineNone;
    AND = 0x5F, "and", InlineNone;
    OR = 0x60, "or", InlineNone;
    XOR = 0x61, "xor", InlineNone;
    SHL = 0x62, "shl", InlineNone;
    SHR = 0x63, "shr", InlineNone;
    SHR_UN = 0x64, "shr.un", InlineNone;
    NEG = 0x65, "neg", InlineNone;
    NOT = 0x66, "not", InlineNone;
    CONV_I1 = 0x67, "conv.i1", InlineNone;
    CONV_I2 = 0x68, "conv.i2", InlineNone;
    CONV_I4 = 0x69, "conv.i4", InlineNone;
    CONV_I8 = 0x6A, "conv.i8", InlineNone;
    CONV_R4 = 0x6B, "conv.r4", InlineNone;
    CONV_R8 = 0x6C, "conv.r8", InlineNone;
    CONV_U4 = 0x6D, "conv.u4", InlineNone;
    CONV_U8 = 0x6E, "conv.u8", InlineNone;
    CALLVIRT = 0x6F, "callvirt", InlineMethod;
    CPOBJ = 0x70, "cpobj", InlineType;
    LDOBJ = 0x71, "ldobj", InlineType;
    LDSTR = 0x72, "ldstr", InlineString;
    NEWOBJ = 0x73, "newobj", InlineMethod;
    CASTCLASS = 0x74, "castclass", InlineType;
    ISINST = 0x75, "isinst", InlineType;
    CONV_R_UN = 0x76, "conv.r.un", InlineNone;
    UNBOX = 0x79, "unbox", InlineType;
    THROW = 0x7A, "throw", InlineNone;
    LDFLD = 0x7B, "ldfld", InlineField;
    LDFLDA = 0x7C, "ldflda", InlineField;
    STFLD = 0x7D, "stfld", InlineField;
    LDSFLD = 0x7E, "ldsfld", InlineField;
    LDSFLDA = 0x7F, "ldsflda", InlineField;
    STSFLD = 0x80, "stsfld", InlineField;
    STOBJ = 0x81, "stobj", InlineType;
    CONV_OVF_I1_UN = 0x82, "conv.ovf.i1.un", InlineNone;
    CONV_OVF_I2_UN = 0x83, "conv.ovf.i2.un", InlineNone;
    CONV_OVF_I4_UN = 0x84, "conv.ovf.i4.un", InlineNone;
    CONV_OVF_I8_UN = 0x85, "conv.ovf.i8.un", InlineNone;
    CONV_OVF_U1_UN = 0x86, "conv.ovf.u1.un", InlineNone;
    CONV_OVF_U2_UN = 0x87, "conv.ovf.u2.un", InlineNone;
    CONV_OVF_U4_UN = 0x88, "conv.ovf.u4.un", InlineNone;
    CONV_OVF_U8_UN = 0x89, "conv.ovf.u8.un", InlineNone;
    CONV_OVF_I_UN = 0x8A, "conv.ovf.i.un", InlineNone;
    CONV_OVF_U_UN = 0x8B, "conv.ovf.u.un", InlineNone;
    BOX = 0x8C, "box", InlineType;
    NEWARR = 0x8D, "newarr", InlineType;
    LDLEN = 0x8E, "ldlen", InlineNone;
    LDELEMA = 0x8F, "ldelema", InlineType;
    LDELEM_I1 = 0x90, "ldelem.i1", InlineNone;
    LDELEM_U1 = 0x91, "ldelem.u1", InlineNone;
    LDELEM_I2 = 0x92, "ldelem.i2", InlineNone;
    LDELEM_U2 = 0x93, "ldelem.u2", InlineNone;
    LDELEM_I4 = 0x94, "ldelem.i4", InlineNone;
    LDELEM_U4 = 0x95, "ldelem.u4", InlineNone;
    LDELEM_I8 = 0x96, "ldelem.i8", InlineNone;
    LDELEM_I = 0x97, "ldelem.i", InlineNone;
    LDELEM_R4 = 0x98, "ldelem.r4", InlineNone;
    LDELEM_R8 = 0x99, "ldelem.r8", InlineNone;
    LDELEM_REF = 0x9A, "ldelem.ref", InlineNone;
    STELEM_I = 0x9B, "stelem.i", InlineNone;
    STELEM_I1 = 0x9C, "stelem.i1", InlineNone;
    STELEM_I2 = 0x9D, "stelem.i2", InlineNone;
    STELEM_I4 = 0x9E, "stelem.i4", InlineNone;
    STELEM_I8 = 0x9F, "stelem.i8", InlineNone;
    STELEM_R4 = 0xA0, "stelem.r4", InlineNone;
    STELEM_R8 = 0xA1, "stelem.r8", InlineNone;
    STELEM_REF = 0xA2, "stelem.ref", InlineNone;
    LDELEM = 0xA3, "ldelem", InlineType;
    STELEM = 0xA4, "stelem", InlineType;
    UNBOX_ANY = 0xA5, "unbox.any", InlineType;
    CONV_OVF_I1 = 0xB3, "conv.ovf.i1", InlineNone;
    CONV_OVF_U1 = 0xB4, "conv.ovf.u1", InlineNone;
    CONV_OVF_I2 = 0xB5, "conv.ovf.i2", InlineNone;
    CONV_OVF_U2 = 0xB6, "conv.ovf.u2", InlineNone;
    CONV_OVF_I4 = 0xB7, "conv.ovf.i4", InlineNone;
    CONV_OVF_U4 = 0xB8, "conv.ovf.u4", InlineNone;
    CONV_OVF_I8 = 0xB9, "conv.ovf.i8", InlineNone;
    CONV_OVF_U8 = 0xBA, "conv.ovf.u8", InlineNone;
    REFANYVAL = 0xC2, "refanyval", InlineType;
    CKFINITE = 0xC3, "ckfinite", InlineNone;
    MKREFANY = 0xC6, "mkrefany", InlineType;
    LDTOKEN = 0xD0, "ldtoken", InlineTok;
    CONV_U2 = 0xD1, "conv.u2", InlineNone;
    CONV_U1 = 0xD2, "conv.u1", InlineNone;
    CONV_I = 0xD3, "conv.i", InlineNone;
    CONV_OVF_I = 0xD4, "conv.ovf.i", InlineNone;
    CONV_OVF_U = 0xD5, "conv.ovf.u", InlineNone;
    ADD_OVF = 0xD6, "add.ovf", InlineNone;
    ADD_OVF_UN = 0xD7, "add.ovf.un", InlineNone;
    MUL_OVF = 0xD8, "mul.ovf", InlineNone;
    MUL_OVF_UN = 0xD9, "mul.ovf.un", InlineNone;
    SUB_OVF = 0xDA, "sub.ovf", InlineNone;
    SUB_OVF_UN = 0xDB, "sub.ovf.un", InlineNone;
    ENDFINALLY = 0xDC, "endfinally", InlineNone;
    LEAVE = 0xDD, "leave", InlineBrTarget;
    LEAVE_S = 0xDE, "leave.s", ShortInlineBrTarget;
    STIND_I = 0xDF, "stind.i", InlineNone;
    CONV_U = 0xE0, "conv.u", InlineNone;

    ARGLIST = 0xFE00, "arglist", InlineNone;
    CEQ = 0xFE01, "ceq", InlineNone;
    CGT = 0xFE02, "cgt", InlineNone;
    CGT_UN = 0xFE03, "cgt.un", InlineNone;
    CLT = 0xFE04, "clt", InlineNone;
    CLT_UN = 0xFE05, "clt.un", InlineNone;
    LDFTN = 0xFE06, "ldftn", InlineMethod;
    LDVIRTFTN = 0xFE07, "ldvirtftn", InlineMethod;
    LDARG = 0xFE09, "ldarg", InlineVar;
    LDARGA = 0xFE0A, "ldarga", InlineVar;
    STARG = 0xFE0B, "starg", InlineVar;
    LDLOC = 0xFE0C, "ldloc", InlineVar;
    LDLOCA = 0xFE0D, "ldloca", InlineVar;
    STLOC = 0xFE0E, "stloc", InlineVar;
    LOCALLOC = 0xFE0F, "localloc", InlineNone;
    ENDFILTER = 0xFE11, "endfilter", InlineNone;
    UNALIGNED = 0xFE12, "unaligned.", ShortInlineI;
    VOLATILE = 0xFE13, "volatile.", InlineNone;
    TAIL = 0xFE14, "tail.", InlineNone;
    INITOBJ = 0xFE15, "initobj", InlineType;
    CONSTRAINED = 0xFE16, "constrained.", InlineType;
    CPBLK = 0xFE17, "cpblk", InlineNone;
    INITBLK = 0xFE18, "initblk", InlineNone;
    NO = 0xFE19, "no.", ShortInlineI;
    RETHROW = 0xFE1A, "rethrow", InlineNone;
    SIZEOF = 0xFE1C, "sizeof", InlineType;
    REFANYTYPE = 0xFE1D, "refanytype", InlineNone;
    READONLY = 0xFE1E, "readonly.", InlineNone;
}

struct Tables {
    primary: [Option<OpCode>; 256],
    secondary: [Option<OpCode>; 256],
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut tables = Tables {
            primary: [None; 256],
            secondary: [None; 256],
        };
        for op in OPCODES {
            let slot = usize::from(op.value & 0xFF);
            if op.value > 0xFF {
                tables.secondary[slot] = Some(*op);
            } else {
                tables.primary[slot] = Some(*op);
            }
        }
        tables
    })
}

/// Looks up a single-byte opcode.
#[must_use]
pub fn lookup(byte: u8) -> Option<OpCode> {
    tables().primary[usize::from(byte)]
}

/// Looks up the opcode `0xFE byte`.
#[must_use]
pub fn lookup_fe(byte: u8) -> Option<OpCode> {
    tables().secondary[usize::from(byte)]
}

/// Looks up an opcode by its combined `u16` value.
#[must_use]
pub fn by_value(value: u16) -> Option<OpCode> {
    match value {
        0x00..=0xFF => lookup(value as u8),
        0xFE00..=0xFEFF => lookup_fe((value & 0xFF) as u8),
        _ => None,
    }
}

/// Every known opcode, in encoding order.
pub fn all() -> impl Iterator<Item = &'static OpCode> {
    OPCODES.iter()
}

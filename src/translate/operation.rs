//! Tags carried by emitted tokens.
//!
//! Both enums have fixed discriminants: [`Operation`] values are written verbatim into program
//! images and [`ValueKind`] values appear in token constants.

use strum::{Display, EnumCount, EnumIter, FromRepr};

/// Instruction kind of an [`crate::program::SsaToken`].
///
/// Constants layout per family:
/// - argument/local access: `[index]`
/// - `LoadConstant`: `[ValueKind, raw value]` (integers sign-extended, floats as IEEE bits)
/// - `LoadString`: `[string pool index]`
/// - field access: `[field token]`
/// - element and indirect access: `[ValueKind]`, or `[Object, type token]` for the typed forms
/// - conversions: `[ValueKind]` of the target
/// - branches and `Leave`: `[absolute target]`; `Switch`: one absolute target per case
/// - calls, `LoadFunction`, `Jump`: `[method token]`; `CallVirtualConstrained` adds the
///   constrained type token
/// - `NewObject`: `[constructor token, string pool index of the constructor name]`
/// - type operations (`NewArray`, `Box`, `CastClass`, ...): `[type token]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount, FromRepr)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum Operation {
    // Stack shaping
    Nop = 0,
    Duplicate = 1,
    Pop = 2,
    Throw = 3,
    Rethrow = 4,

    // Arguments, locals and constants
    LoadArgument = 10,
    LoadArgumentAddress = 11,
    StoreArgument = 12,
    LoadLocal = 13,
    LoadLocalAddress = 14,
    StoreLocal = 15,
    LoadNull = 16,
    LoadConstant = 17,
    LoadString = 18,
    LoadToken = 19,

    // Fields
    LoadField = 20,
    LoadFieldAddress = 21,
    StoreField = 22,
    LoadStaticField = 23,
    LoadStaticFieldAddress = 24,
    StoreStaticField = 25,

    // Arrays, pointers and memory
    LoadElement = 30,
    LoadElementAddress = 31,
    StoreElement = 32,
    LoadLength = 33,
    LoadIndirect = 34,
    StoreIndirect = 35,
    LoadObject = 36,
    StoreObject = 37,
    InitObject = 38,
    SizeOf = 39,
    LocalAlloc = 40,
    CopyBlock = 41,
    InitBlock = 42,

    // Arithmetic and bitwise
    Add = 50,
    AddCheckOverflow = 51,
    UAddCheckOverflow = 52,
    Subtract = 53,
    SubtractCheckOverflow = 54,
    USubtractCheckOverflow = 55,
    Multiply = 56,
    MultiplyCheckOverflow = 57,
    UMultiplyCheckOverflow = 58,
    Divide = 59,
    UDivide = 60,
    Remainder = 61,
    URemainder = 62,
    And = 63,
    Or = 64,
    Xor = 65,
    ShiftLeft = 66,
    ShiftRight = 67,
    UShiftRight = 68,
    Negate = 69,
    Not = 70,

    // Comparison
    CompareEqual = 80,
    CompareGreater = 81,
    UCompareGreater = 82,
    CompareLess = 83,
    UCompareLess = 84,

    // Conversion
    Convert = 90,
    ConvertCheckOverflow = 91,
    ConvertCheckOverflowUn = 92,

    // Control flow
    Branch = 100,
    BranchTrue = 101,
    BranchFalse = 102,
    BranchEqual = 103,
    UBranchNotEqual = 104,
    BranchGreaterOrEqual = 105,
    UBranchGreaterOrEqual = 106,
    BranchGreater = 107,
    UBranchGreater = 108,
    BranchLessOrEqual = 109,
    UBranchLessOrEqual = 110,
    BranchLess = 111,
    UBranchLess = 112,
    Switch = 113,
    Leave = 114,
    EndFinally = 115,
    EndFilter = 116,
    Return = 117,
    Jump = 118,

    // Calls and construction
    Call = 120,
    CallVirtual = 121,
    CallVirtualConstrained = 122,
    NewObject = 123,
    NewArray = 124,
    LoadFunction = 125,

    // Type operations
    IsInstance = 130,
    CastClass = 131,
    Box = 132,
    UnboxAny = 133,
}

impl Operation {
    /// `true` for operations that record a single absolute branch target.
    #[must_use]
    pub fn is_branch(self) -> bool {
        matches!(self as u32, 100..=112) || self == Operation::Leave
    }
}

/// Numeric representation tag used by loads, stores and conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum ValueKind {
    /// Native-sized signed integer
    I = 0,
    /// 8-bit signed integer
    I1 = 1,
    /// 16-bit signed integer
    I2 = 2,
    /// 32-bit signed integer
    I4 = 3,
    /// 64-bit signed integer
    I8 = 4,
    /// Native-sized unsigned integer
    U = 5,
    /// 8-bit unsigned integer
    U1 = 6,
    /// 16-bit unsigned integer
    U2 = 7,
    /// 32-bit unsigned integer
    U4 = 8,
    /// 64-bit unsigned integer
    U8 = 9,
    /// 32-bit float
    R4 = 10,
    /// 64-bit float
    R8 = 11,
    /// Float converted from an unsigned integer (`conv.r.un`)
    RUn = 12,
    /// Object reference
    Object = 13,
}

impl ValueKind {
    /// Derives the kind from a mnemonic's type suffix, e.g. `ldelem.u2`, `conv.ovf.i4.un`
    /// or `stind.ref`. Returns `None` when the mnemonic carries no suffix.
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<ValueKind> {
        let mut parts = mnemonic.split('.').skip(1).filter(|part| *part != "ovf");
        let suffix = parts.next()?;
        let unsigned_source = parts.next() == Some("un");

        Some(match suffix {
            "i" => ValueKind::I,
            "i1" => ValueKind::I1,
            "i2" => ValueKind::I2,
            "i4" => ValueKind::I4,
            "i8" => ValueKind::I8,
            "u" => ValueKind::U,
            "u1" => ValueKind::U1,
            "u2" => ValueKind::U2,
            "u4" => ValueKind::U4,
            "u8" => ValueKind::U8,
            "r4" => ValueKind::R4,
            "r8" => ValueKind::R8,
            "r" if unsigned_source => ValueKind::RUn,
            "ref" => ValueKind::Object,
            _ => return None,
        })
    }

    /// The kind as a token constant.
    #[must_use]
    pub fn constant(self) -> u64 {
        self as u64
    }
}

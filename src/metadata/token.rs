//! Metadata tokens.
//!
//! A token is the 32-bit handle that bytecode operands use to reference metadata: the high byte
//! names the kind of entity (type, field, method, string literal) and the low 24 bits its row.
//! Tokens appear verbatim in the emitted [`crate::program::SsaToken`] constants, so the encoding
//! follows the ECMA-335 table numbering that the downstream emitter expects.

use std::fmt;

use strum::{Display, FromRepr};

use crate::Result;

/// Entity kinds addressed by the high byte of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[repr(u8)]
pub enum TokenKind {
    /// A type definition
    TypeDef = 0x02,
    /// A field definition
    Field = 0x04,
    /// A method or constructor definition
    MethodDef = 0x06,
    /// A string literal
    UserString = 0x70,
}

/// A metadata token.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token of `kind` pointing at `row`.
    #[must_use]
    pub fn from_parts(kind: TokenKind, row: u32) -> Self {
        Token((u32::from(kind as u8) << 24) | (row & 0x00FF_FFFF))
    }

    /// Parses a token written as hexadecimal (`0x06000001`) or decimal.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if `text` is not a number.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let value = match text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
        {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => text.parse::<u32>(),
        };

        value
            .map(Token)
            .map_err(|_| config_error!("Invalid metadata token '{}'", text))
    }

    /// Raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Table index stored in the high byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Row stored in the low 24 bits.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// The entity kind, if the table byte is one this crate understands.
    #[must_use]
    pub fn kind(&self) -> Option<TokenKind> {
        TokenKind::from_repr(self.table())
    }

    /// `true` for the zero token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "Token(0x{:08x}, {}, row: {})", self.0, kind, self.row()),
            None => write!(
                f,
                "Token(0x{:08x}, table: 0x{:02x}, row: {})",
                self.0,
                self.table(),
                self.row()
            ),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

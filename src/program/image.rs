//! Program image wire format.
//!
//! ```text
//! u32   magic 0xDEADBEEF
//! u32   type record count
//! u32   method record count
//! u32   native method count
//! type records:    str name, u8 is_static, u32 field count, (str type, str name)*
//! method records:  str name, u8 is_static, u8 is_constructor, u8 init_locals,
//!                  u32 max_stack, u32 string count, str*, u32 token count, token*
//! token:           u32 id, u32 offset, u32 operation, str string,
//!                  u32 parameter count, u32*, u32 constant count, u64*
//! native methods:  (str mangled name, str symbol)*
//! ```
//!
//! Integers are little-endian; `str` is UTF-8 prefixed with its 7-bit encoded byte length.

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::{
    program::records::{MethodRecord, Records, SsaToken, TypeRecord},
    translate::Operation,
    utils::{read_le_at, write_le, WireIO},
    Result,
};

/// Leading marker of every program image.
pub const IMAGE_MAGIC: u32 = 0xDEAD_BEEF;

/// Serialises [`Records`] into the program image format.
pub struct ProgramWriter<'a> {
    records: &'a Records,
}

impl<'a> ProgramWriter<'a> {
    /// Creates a writer over `records`.
    #[must_use]
    pub fn new(records: &'a Records) -> Self {
        ProgramWriter { records }
    }

    /// Encodes the image into memory.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let records = self.records;
        let mut out = Vec::new();

        write_le(&mut out, IMAGE_MAGIC);
        write_count(&mut out, records.type_records.len());
        write_count(&mut out, records.method_records.len());
        write_count(&mut out, records.native_methods.len());

        for record in &records.type_records {
            write_string(&mut out, &record.name);
            write_bool(&mut out, record.is_static);
            write_count(&mut out, record.fields.len());
            for (field_type, name) in &record.fields {
                write_string(&mut out, field_type);
                write_string(&mut out, name);
            }
        }

        for record in &records.method_records {
            write_string(&mut out, &record.name);
            write_bool(&mut out, record.is_static);
            write_bool(&mut out, record.is_constructor);
            write_bool(&mut out, record.init_locals);
            write_le(&mut out, record.max_stack);

            write_count(&mut out, record.strings.len());
            for string in &record.strings {
                write_string(&mut out, string);
            }

            write_count(&mut out, record.tokens.len());
            for token in &record.tokens {
                write_token(&mut out, token);
            }
        }

        for (name, symbol) in &records.native_methods {
            write_string(&mut out, name);
            write_string(&mut out, symbol);
        }

        out
    }

    /// Writes the image to `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be written.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes();
        log::info!(
            "Writing program image '{}' ({} bytes)",
            path.as_ref().display(),
            bytes.len()
        );
        fs::write(path, bytes)?;
        Ok(())
    }
}

fn write_count(out: &mut Vec<u8>, count: usize) {
    write_le(out, count as u32);
}

fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push(u8::from(value));
}

fn write_7bit_encoded_int(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    write_7bit_encoded_int(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

fn write_token(out: &mut Vec<u8>, token: &SsaToken) {
    write_le(out, token.id);
    write_le(out, token.offset);
    write_le(out, token.operation as u32);
    write_string(out, token.string.as_deref().unwrap_or_default());

    write_count(out, token.parameters.len());
    for parameter in &token.parameters {
        write_le(out, *parameter);
    }

    write_count(out, token.constants.len());
    for constant in &token.constants {
        write_le(out, *constant);
    }
}

/// Parses program images back into [`Records`].
pub struct ProgramReader;

impl ProgramReader {
    /// Parses an image held in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the magic does not match, the image is
    /// truncated, or it contains an unknown operation tag or invalid UTF-8.
    pub fn from_bytes(data: &[u8]) -> Result<Records> {
        let mut parser = ImageParser::new(data);

        let magic = parser.read_le::<u32>()?;
        if magic != IMAGE_MAGIC {
            return Err(malformed_error!(
                "Not a program image - magic 0x{:08X}, expected 0x{:08X}",
                magic,
                IMAGE_MAGIC
            ));
        }

        let type_count = parser.read_count()?;
        let method_count = parser.read_count()?;
        let native_count = parser.read_count()?;

        let mut records = Records::new();

        for _ in 0..type_count {
            let mut record = TypeRecord::new(parser.read_string()?, parser.read_bool()?);
            for _ in 0..parser.read_count()? {
                let field_type = parser.read_string()?;
                let name = parser.read_string()?;
                record.add_field(field_type, name);
            }
            records.type_names.insert(record.name.clone());
            records.type_records.push(record);
        }

        for _ in 0..method_count {
            let record = parser.read_method()?;
            records.method_names.insert(record.name.clone());
            records.method_records.push(record);
        }

        for _ in 0..native_count {
            let name = parser.read_string()?;
            let symbol = parser.read_string()?;
            records.native_methods.insert(name, symbol);
        }

        if parser.remaining() > 0 {
            log::warn!("{} trailing bytes after program image", parser.remaining());
        }

        log::debug!(
            "Loaded program image: {} type records, {} method records, {} native bindings",
            records.type_records.len(),
            records.method_records.len(),
            records.native_methods.len()
        );
        Ok(records)
    }

    /// Memory-maps and parses an image file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped, otherwise
    /// the errors of [`ProgramReader::from_bytes`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Records> {
        let file = fs::File::open(path.as_ref())?;
        // SAFETY: the mapping is read-only and dropped before this function returns; the image
        // is fully copied into owned records.
        let mmap = unsafe { Mmap::map(&file) }?;
        Self::from_bytes(&mmap)
    }
}

/// Bounds-checked cursor over an image.
struct ImageParser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ImageParser<'a> {
    fn new(data: &'a [u8]) -> Self {
        ImageParser { data, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    fn read_le<T: WireIO>(&mut self) -> Result<T> {
        let at = self.position;
        read_le_at(self.data, &mut self.position).ok_or_else(|| {
            malformed_error!(
                "Truncated image: {} bytes needed at offset {}, {} available",
                std::mem::size_of::<T>(),
                at,
                self.remaining()
            )
        })
    }

    fn read_count(&mut self) -> Result<u32> {
        self.read_le::<u32>()
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.read_le::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(malformed_error!(
                "Invalid boolean 0x{:02X} at offset {}",
                other,
                self.position - 1
            )),
        }
    }

    fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0;

        loop {
            let byte = self.read_le::<u8>()?;
            value |= u32::from(byte & 0x7F) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                break;
            }

            if shift >= 32 {
                return Err(malformed_error!(
                    "7-bit encoded integer overflow at offset {}",
                    self.position
                ));
            }
        }

        Ok(value)
    }

    fn read_string(&mut self) -> Result<String> {
        let length = self.read_7bit_encoded_int()? as usize;
        let start = self.position;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                malformed_error!(
                    "Truncated image: string of {} bytes at offset {}",
                    length,
                    start
                )
            })?;

        let value = std::str::from_utf8(&self.data[start..end])
            .map_err(|_| malformed_error!("Invalid UTF-8 string at offset {}", start))?;
        self.position = end;
        Ok(value.to_string())
    }

    fn read_method(&mut self) -> Result<MethodRecord> {
        let name = self.read_string()?;
        let is_static = self.read_bool()?;
        let is_constructor = self.read_bool()?;
        let init_locals = self.read_bool()?;
        let max_stack = self.read_le::<u32>()?;

        let mut strings = Vec::new();
        for _ in 0..self.read_count()? {
            strings.push(self.read_string()?);
        }

        let mut tokens = Vec::new();
        for _ in 0..self.read_count()? {
            tokens.push(self.read_token()?);
        }

        Ok(MethodRecord {
            name,
            is_static,
            is_constructor,
            init_locals,
            max_stack,
            strings,
            tokens,
        })
    }

    fn read_token(&mut self) -> Result<SsaToken> {
        let id = self.read_le::<u32>()?;
        let offset = self.read_le::<u32>()?;
        let tag = self.read_le::<u32>()?;
        let operation = Operation::from_repr(tag)
            .ok_or_else(|| malformed_error!("Unknown operation tag {} in token {}", tag, id))?;
        let string = self.read_string()?;

        let mut parameters = Vec::new();
        for _ in 0..self.read_count()? {
            parameters.push(self.read_le::<u32>()?);
        }

        let mut constants = Vec::new();
        for _ in 0..self.read_count()? {
            constants.push(self.read_le::<u64>()?);
        }

        Ok(SsaToken::new(id, offset, operation)
            .with_parameters(parameters)
            .with_constants(constants)
            .with_string(string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample() -> Records {
        let mut records = Records::new();

        let mut point = TypeRecord::new("Demo.Point", false);
        point.add_field("System.Int32", "x");
        point.add_field("System.Int32", "y");
        records.add_type(point);
        records.add_type(TypeRecord::new("Demo.Point_static", true));

        records.add_method(MethodRecord {
            name: "System.Void____Demo.Program.Main_static".into(),
            is_static: true,
            is_constructor: false,
            init_locals: true,
            max_stack: 8,
            strings: vec!["héllo".into()],
            tokens: vec![
                SsaToken::new(0, 0, Operation::LoadString)
                    .with_constants(vec![0])
                    .with_string("héllo"),
                SsaToken::new(1, 5, Operation::Call)
                    .with_parameters(vec![0])
                    .with_constants(vec![0x0600_0002])
                    .with_string("System.Void___System.String___Demo.Console.WriteLine_static"),
                SsaToken::new(2, 10, Operation::LoadConstant).with_constants(vec![3, u64::MAX]),
                SsaToken::new(3, 15, Operation::Return),
            ],
        });

        records.native_methods.insert(
            "System.Void___System.String___Demo.Console.WriteLine_static".into(),
            "console_writeline".into(),
        );
        records
    }

    #[test]
    fn round_trip() {
        let records = sample();
        let bytes = ProgramWriter::new(&records).to_bytes();

        assert_eq!(&bytes[..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &1u32.to_le_bytes());

        let loaded = ProgramReader::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = 0x00;

        assert!(matches!(
            ProgramReader::from_bytes(&bytes),
            Err(Error::MalformedImage { .. })
        ));
    }

    #[test]
    fn truncated_image() {
        let bytes = sample().to_bytes();
        for cut in [3, 16, 30, bytes.len() - 1] {
            assert!(
                matches!(
                    ProgramReader::from_bytes(&bytes[..cut]),
                    Err(Error::MalformedImage { .. })
                ),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn long_strings_use_multibyte_length() {
        let mut out = Vec::new();
        write_string(&mut out, &"a".repeat(300));
        assert_eq!(&out[..2], &[0xAC, 0x02]);

        let mut parser = ImageParser::new(&out);
        assert_eq!(parser.read_string().unwrap().len(), 300);
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn unknown_operation_tag() {
        let mut out = Vec::new();
        write_le(&mut out, 0u32);
        write_le(&mut out, 0u32);
        write_le(&mut out, 0xFFFF_FFFFu32);

        let mut parser = ImageParser::new(&out);
        assert!(matches!(
            parser.read_token(),
            Err(Error::MalformedImage { .. })
        ));
    }
}

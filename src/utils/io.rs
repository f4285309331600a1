//! Little-endian primitive encoding shared by the instruction decoder and the image format.
//!
//! [`WireIO`] abstracts over the fixed-width integer types so that cursors can read any of them
//! generically with bounds checking, and writers can append them without per-type code.

/// Fixed-width integer types that can be read from and written to little-endian byte buffers.
pub(crate) trait WireIO: Sized + Copy {
    /// Byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read `Self` from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write `Self` to little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_wire_io {
    ($($ty:ty => $n:literal),* $(,)?) => {
        $(
            impl WireIO for $ty {
                type Bytes = [u8; $n];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_wire_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
}

/// Reads a `T` at `offset` and advances the offset past it.
///
/// Returns `None` if fewer than `size_of::<T>()` bytes remain; the offset is untouched then.
pub(crate) fn read_le_at<T: WireIO>(data: &[u8], offset: &mut usize) -> Option<T> {
    let size = std::mem::size_of::<T>();
    let end = offset.checked_add(size)?;
    let slice = data.get(*offset..end)?;
    let bytes = T::Bytes::try_from(slice).ok()?;

    *offset = end;
    Some(T::from_le_bytes(bytes))
}

/// Appends `value` to `out` in little-endian order.
pub(crate) fn write_le<T: WireIO>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_le_bytes().as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_advances() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF];
        let mut offset = 0;

        assert_eq!(read_le_at::<u16>(&data, &mut offset), Some(0x0201));
        assert_eq!(offset, 2);
        assert_eq!(read_le_at::<u16>(&data, &mut offset), Some(0x0403));
        assert_eq!(read_le_at::<i8>(&data, &mut offset), Some(-1));
        assert_eq!(offset, 5);
    }

    #[test]
    fn read_past_end() {
        let data = [0x01, 0x02, 0x03];
        let mut offset = 1;

        assert_eq!(read_le_at::<u32>(&data, &mut offset), None);
        assert_eq!(offset, 1);
    }

    #[test]
    fn write_then_read() {
        let mut out = Vec::new();
        write_le(&mut out, 0xDEADBEEFu32);
        write_le(&mut out, -2i64);
        assert_eq!(&out[..4], &[0xEF, 0xBE, 0xAD, 0xDE]);

        let mut offset = 4;
        assert_eq!(read_le_at::<i64>(&out, &mut offset), Some(-2));
    }
}

//! Raw byte reinterpretation for numeric elements
//!
//! Transfers return untyped little-endian bytes. These helpers turn them into
//! native values and back. No conversion between element types happens here.

use crate::TypeDescriptor;
use thiserror::Error;

/// Codec errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer does not hold a whole number of elements
    #[error("buffer of {len} bytes is not a multiple of element size {element_size}")]
    Misaligned { len: usize, element_size: usize },
}

/// A native numeric type with a fixed storage layout
pub trait Element: Copy + Send + Sync + 'static {
    /// Storage descriptor for this type
    const DESCRIPTOR: TypeDescriptor;

    /// Reads one value from exactly `DESCRIPTOR.byte_size()` bytes
    fn read_le(bytes: &[u8]) -> Self;

    /// Appends the little-endian encoding of `self`
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($ty:ty, $desc:expr) => {
        impl Element for $ty {
            const DESCRIPTOR: TypeDescriptor = $desc;

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_element!(i8, TypeDescriptor::int8());
impl_element!(i16, TypeDescriptor::int16());
impl_element!(i32, TypeDescriptor::int32());
impl_element!(i64, TypeDescriptor::int64());
impl_element!(u8, TypeDescriptor::uint8());
impl_element!(u16, TypeDescriptor::uint16());
impl_element!(u32, TypeDescriptor::uint32());
impl_element!(u64, TypeDescriptor::uint64());
impl_element!(f32, TypeDescriptor::float32());
impl_element!(f64, TypeDescriptor::float64());

/// Decodes a little-endian byte buffer into values of `T`
pub fn decode<T: Element>(bytes: &[u8]) -> Result<Vec<T>, CodecError> {
    let element_size = T::DESCRIPTOR.byte_size();
    if bytes.len() % element_size != 0 {
        return Err(CodecError::Misaligned {
            len: bytes.len(),
            element_size,
        });
    }
    Ok(bytes.chunks_exact(element_size).map(T::read_le).collect())
}

/// Encodes values of `T` as little-endian bytes
pub fn encode<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::DESCRIPTOR.byte_size());
    for v in values {
        v.write_le(&mut out);
    }
    out
}

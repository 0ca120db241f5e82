//! Element type descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of an array element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeClass {
    /// Signed two's complement integer
    Integer,
    /// Unsigned integer
    Unsigned,
    /// IEEE 754 floating point
    Float,
    /// Packed bits with no numeric meaning
    Bitfield,
    /// Uninterpreted bytes
    Opaque,
}

impl TypeClass {
    /// Returns a human readable name for the class
    pub fn name(&self) -> &'static str {
        match self {
            TypeClass::Integer => "integer",
            TypeClass::Unsigned => "unsigned integer",
            TypeClass::Float => "float",
            TypeClass::Bitfield => "bitfield",
            TypeClass::Opaque => "opaque",
        }
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes one array element: its class and its width in bytes.
///
/// Multi-byte values are little-endian on the storage side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    class: TypeClass,
    byte_size: usize,
}

impl TypeDescriptor {
    /// Creates a descriptor from a class and byte width
    pub const fn new(class: TypeClass, byte_size: usize) -> Self {
        Self { class, byte_size }
    }

    pub const fn int8() -> Self {
        Self::new(TypeClass::Integer, 1)
    }

    pub const fn int16() -> Self {
        Self::new(TypeClass::Integer, 2)
    }

    pub const fn int32() -> Self {
        Self::new(TypeClass::Integer, 4)
    }

    pub const fn int64() -> Self {
        Self::new(TypeClass::Integer, 8)
    }

    pub const fn uint8() -> Self {
        Self::new(TypeClass::Unsigned, 1)
    }

    pub const fn uint16() -> Self {
        Self::new(TypeClass::Unsigned, 2)
    }

    pub const fn uint32() -> Self {
        Self::new(TypeClass::Unsigned, 4)
    }

    pub const fn uint64() -> Self {
        Self::new(TypeClass::Unsigned, 8)
    }

    pub const fn float32() -> Self {
        Self::new(TypeClass::Float, 4)
    }

    pub const fn float64() -> Self {
        Self::new(TypeClass::Float, 8)
    }

    /// Returns the element class
    pub fn class(&self) -> TypeClass {
        self.class
    }

    /// Returns the element width in bytes
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Returns the class name, e.g. `"float"`
    pub fn class_name(&self) -> &'static str {
        self.class.name()
    }

    /// Checks whether `T` has exactly this layout
    pub fn check<T: crate::Element>(&self) -> bool {
        *self == T::DESCRIPTOR
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.byte_size * 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_sizes() {
        assert_eq!(TypeDescriptor::int32().byte_size(), 4);
        assert_eq!(TypeDescriptor::float64().byte_size(), 8);
        assert_eq!(TypeDescriptor::uint8().class(), TypeClass::Unsigned);
    }

    #[test]
    fn test_class_name() {
        assert_eq!(TypeDescriptor::float32().class_name(), "float");
        assert_eq!(TypeClass::Opaque.to_string(), "opaque");
    }

    #[test]
    fn test_check_element() {
        assert!(TypeDescriptor::int32().check::<i32>());
        assert!(!TypeDescriptor::int32().check::<u32>());
        assert!(!TypeDescriptor::int32().check::<f32>());
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeDescriptor::int16().to_string(), "integer16");
    }

    #[test]
    fn test_serde_round_trip() {
        let ty = TypeDescriptor::float64();
        let json = serde_json::to_string(&ty).unwrap();
        let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}

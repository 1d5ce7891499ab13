//! Structures laid out on disk in a usdc file.

use std::{ffi::CStr, fmt};

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use strum::{Display, EnumCount, FromRepr};

use crate::sdf;

use super::Error;

/// Appears at start of file, houses version, file identifier string and offset to TOC.
#[repr(C)]
#[derive(Default, Debug, Clone, Copy, Pod, Zeroable)]
pub struct Bootstrap {
    /// "PXR-USDC"
    pub ident: [u8; 8],
    /// 0: major, 1: minor, 2: patch, rest unused.
    pub version: [u8; 8],
    /// Offset to TOC.
    pub toc_offset: u64,
    /// Unused.
    pub(super) reserved: [u64; 8],
}

impl Bootstrap {
    pub const IDENT: &'static [u8; 8] = b"PXR-USDC";
}

/// Max section's name length.
const SECTION_NAME_MAX_LENGTH: usize = 15;

/// Table of contents entry.
#[repr(C)]
#[derive(Default, Clone, Copy, Pod, Zeroable)]
pub struct Section {
    /// Section name bytes (e.g. "TOKENS"), use [Section::name] to retrieve as string.
    name: [u8; SECTION_NAME_MAX_LENGTH + 1],
    /// Section start offset.
    pub start: u64,
    /// Section size.
    pub size: u64,
}

impl Section {
    pub const TOKENS: &'static str = "TOKENS";
    pub const STRINGS: &'static str = "STRINGS";
    pub const FIELDS: &'static str = "FIELDS";
    pub const FIELDSETS: &'static str = "FIELDSETS";
    pub const PATHS: &'static str = "PATHS";
    pub const SPECS: &'static str = "SPECS";

    pub const KNOWN: [&'static str; 6] = [
        Self::TOKENS,
        Self::STRINGS,
        Self::FIELDS,
        Self::FIELDSETS,
        Self::PATHS,
        Self::SPECS,
    ];

    pub fn new(name: &str, start: u64, size: u64) -> Self {
        let mut section = Section {
            start,
            size,
            ..Default::default()
        };

        let len = name.len().min(SECTION_NAME_MAX_LENGTH);
        section.name[..len].copy_from_slice(&name.as_bytes()[..len]);
        section
    }

    /// Convert array of bytes to a human-readable string.
    pub fn name(&self) -> &str {
        CStr::from_bytes_until_nul(&self.name)
            .unwrap_or_default()
            .to_str()
            .unwrap_or_default()
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (start: {}, size: {})", self.name(), self.start, self.size)
    }
}

/// Named, typed value slot.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub token_index: usize,
    pub value_rep: ValueRep,
}

impl Field {
    pub fn new(index: u32, value: u64) -> Self {
        Self {
            token_index: index as usize,
            value_rep: ValueRep(value),
        }
    }
}

/// Spec data loaded from file.
#[derive(Default, Debug, Clone, Copy)]
pub struct Spec {
    pub path_index: usize,
    pub fieldset_index: usize,
    pub spec_type: sdf::SpecType,
}

/// Value in file representation.
///
/// Consists of a 2 bytes of type information (type enum value, array bit,
/// inlined-value bit and compressed bit) and 6 bytes of data.
///
/// If possible, certain values are stored directly in the local data,
/// such as ints, floats, enums, and special-case values of other types (zero
/// vectors, identity matrices, etc).
///
/// For values that aren't stored inline, the 6 data bytes are the offset from
/// the start of the file to the value's location.
#[repr(transparent)]
#[derive(Default, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct ValueRep(pub u64);

impl fmt::Debug for ValueRep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ValueRep {} (ty={}, inlined={}, array={}, compressed={})",
            self.payload(),
            self.ty().unwrap_or_default(),
            self.is_inlined(),
            self.is_array(),
            self.is_compressed()
        )
    }
}

impl ValueRep {
    const ARRAY_BIT: u64 = 1 << 63;
    const INLINED_BIT: u64 = 1 << 62;
    const COMPRESSED_BIT: u64 = 1 << 61;
    const PAYLOAD_MASK: u64 = (1 << 48) - 1;

    pub const fn new(ty: Type, payload: u64, inlined: bool, array: bool, compressed: bool) -> Self {
        let mut data = ((ty as u64) << 48) | (payload & Self::PAYLOAD_MASK);

        if array {
            data |= Self::ARRAY_BIT;
        }
        if inlined {
            data |= Self::INLINED_BIT;
        }
        if compressed {
            data |= Self::COMPRESSED_BIT;
        }

        ValueRep(data)
    }

    /// Inlined scalar value.
    #[inline]
    pub const fn inlined(ty: Type, payload: u64) -> Self {
        Self::new(ty, payload, true, false, false)
    }

    #[inline]
    pub fn ty(self) -> Result<Type> {
        let index = ((self.data() >> 48) & 0xFF) as u32;
        Type::from_repr(index).ok_or_else(|| Error::format(format!("Unable to parse type enum {index}")).into())
    }

    #[inline]
    pub fn payload(self) -> u64 {
        self.data() & Self::PAYLOAD_MASK
    }

    #[inline]
    fn data(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_compressed(self) -> bool {
        self.data() & Self::COMPRESSED_BIT != 0
    }

    #[inline]
    pub fn is_inlined(self) -> bool {
        self.data() & Self::INLINED_BIT != 0
    }

    #[inline]
    pub fn is_array(self) -> bool {
        self.data() & Self::ARRAY_BIT != 0
    }
}

#[repr(u32)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, FromRepr, EnumCount, Display)]
pub enum Type {
    #[default]
    Invalid = 0,

    Bool = 1,
    Uchar = 2,
    Int = 3,
    Uint = 4,
    Int64 = 5,
    Uint64 = 6,
    Half = 7,
    Float = 8,
    Double = 9,
    String = 10,
    Token = 11,
    AssetPath = 12,
    Quatd = 16,
    Quatf = 17,
    Quath = 18,
    Vec2d = 19,
    Vec2f = 20,
    Vec2h = 21,
    Vec2i = 22,
    Vec3d = 23,
    Vec3f = 24,
    Vec3h = 25,
    Vec3i = 26,
    Vec4d = 27,
    Vec4f = 28,
    Vec4h = 29,
    Vec4i = 30,
    Matrix2d = 13,
    Matrix3d = 14,
    Matrix4d = 15,

    // Non-array types.
    Dictionary = 31,
    TokenListOp = 32,
    StringListOp = 33,
    PathListOp = 34,
    ReferenceListOp = 35,
    IntListOp = 36,
    Int64ListOp = 37,
    UIntListOp = 38,
    UInt64ListOp = 39,
    PathVector = 40,
    TokenVector = 41,
    Specifier = 42,
    Permission = 43,
    Variability = 44,
    VariantSelectionMap = 45,
    TimeSamples = 46,
    Payload = 47,
    DoubleVector = 48,
    LayerOffsetVector = 49,
    StringVector = 50,
    ValueBlock = 51,
    Value = 52,
    UnregisteredValue = 53,
    UnregisteredValueListOp = 54,
    PayloadListOp = 55,

    // These array types appear here since the greatest enumerant value must be last.
    TimeCode = 56,
    PathExpression = 57,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<Bootstrap>(), 88);
        assert_eq!(std::mem::size_of::<Section>(), 32);
        assert_eq!(std::mem::size_of::<ValueRep>(), 8);
    }

    #[test]
    fn test_section_name() {
        let section = Section::new(Section::FIELDSETS, 100, 20);
        assert_eq!(section.name(), "FIELDSETS");

        let section = Section::new("A_VERY_LONG_SECTION_NAME", 0, 0);
        assert_eq!(section.name().len(), SECTION_NAME_MAX_LENGTH);
    }

    #[test]
    fn test_value_rep_bits() {
        let rep = ValueRep::new(Type::Float, 1234, false, true, true);

        assert_eq!(rep.ty().unwrap(), Type::Float);
        assert_eq!(rep.payload(), 1234);
        assert!(rep.is_array());
        assert!(rep.is_compressed());
        assert!(!rep.is_inlined());

        let rep = ValueRep::inlined(Type::Token, 7);
        assert!(rep.is_inlined());
        assert!(!rep.is_array());
        assert_eq!(rep.ty().unwrap(), Type::Token);
    }

    #[test]
    fn test_value_rep_unknown_type() {
        let rep = ValueRep(200_u64 << 48);
        assert!(rep.ty().is_err());
    }
}

//! Crate format version.

use std::fmt;

use super::Bootstrap;

/// Crate file version, compared as `major.minor.patch`.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Make version helper.
pub const fn version(major: u8, minor: u8, patch: u8) -> Version {
    Version { major, minor, patch }
}

impl Version {
    /// Oldest layout this reader understands (compressed structural sections).
    pub const MIN_SUPPORTED: Version = version(0, 4, 0);

    /// Whether this reader understands the layout. Newer versions are read
    /// optimistically.
    #[inline]
    pub fn is_supported(self) -> bool {
        self >= Self::MIN_SUPPORTED
    }

    /// Files before 0.7.0 store array lengths as `u32` instead of `u64`.
    #[inline]
    pub fn has_32bit_array_sizes(self) -> bool {
        self < version(0, 7, 0)
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        (self.major as u32) << 16 | (self.minor as u32) << 8 | self.patch as u32
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.as_u32() != 0
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.as_u32().cmp(&other.as_u32()))
    }
}

impl From<Bootstrap> for Version {
    fn from(boot: Bootstrap) -> Self {
        version(boot.version[0], boot.version[1], boot.version[2])
    }
}

use core::fmt;

use crate::DWORD_BYTES;

/// Which register file a value lives in.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub enum RegType {
    /// One value shared by every lane of the wave.
    Sgpr,
    /// One value per lane.
    Vgpr,
}

impl fmt::Display for RegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sgpr => f.write_str("s"),
            Self::Vgpr => f.write_str("v"),
        }
    }
}

/// A register class: file, size and whether the size is counted in bytes rather than dwords.
///
// bitpacked: [subdword:7, vgpr:6, size:0..=5]
#[derive(PartialEq, Eq, Copy, Clone, Hash)]
pub struct RegClass(u8);

impl RegClass {
    const SUBDWORD_BIT: u8 = 1 << 7;
    const VGPR_BIT: u8 = 1 << 6;
    const SIZE_MASK: u8 = 0b11_1111;

    pub const S1: Self = Self::new(RegType::Sgpr, 1);
    pub const S2: Self = Self::new(RegType::Sgpr, 2);
    pub const S3: Self = Self::new(RegType::Sgpr, 3);
    pub const S4: Self = Self::new(RegType::Sgpr, 4);
    pub const S8: Self = Self::new(RegType::Sgpr, 8);

    pub const V1: Self = Self::new(RegType::Vgpr, 1);
    pub const V2: Self = Self::new(RegType::Vgpr, 2);
    pub const V3: Self = Self::new(RegType::Vgpr, 3);
    pub const V4: Self = Self::new(RegType::Vgpr, 4);

    pub const V1B: Self = Self::subdword(1);
    pub const V2B: Self = Self::subdword(2);
    pub const V3B: Self = Self::subdword(3);
    pub const V6B: Self = Self::subdword(6);

    /// A whole-dword class of `size` dwords.
    #[must_use]
    pub const fn new(ty: RegType, size: u8) -> Self {
        assert!(size > 0 && size <= Self::SIZE_MASK, "register class size out of range");

        match ty {
            RegType::Sgpr => Self(size),
            RegType::Vgpr => Self(Self::VGPR_BIT | size),
        }
    }

    /// A per-lane class of `bytes` bytes, packed below dword granularity.
    #[must_use]
    pub const fn subdword(bytes: u8) -> Self {
        assert!(bytes > 0 && bytes <= Self::SIZE_MASK, "sub-dword class size out of range");

        Self(Self::SUBDWORD_BIT | Self::VGPR_BIT | bytes)
    }

    /// The smallest class of file `ty` that holds `bytes` bytes.
    ///
    /// Scalar registers can't be addressed below a dword, so scalar classes always round up.
    #[must_use]
    pub const fn get(ty: RegType, bytes: u8) -> Self {
        match ty {
            RegType::Sgpr => Self::new(ty, bytes.div_ceil(DWORD_BYTES)),
            RegType::Vgpr if bytes % DWORD_BYTES == 0 => Self::new(ty, bytes / DWORD_BYTES),
            RegType::Vgpr => Self::subdword(bytes),
        }
    }

    #[must_use]
    #[inline(always)]
    pub const fn ty(self) -> RegType {
        match self.0 & Self::VGPR_BIT {
            0 => RegType::Sgpr,
            _ => RegType::Vgpr,
        }
    }

    #[must_use]
    #[inline(always)]
    pub const fn is_subdword(self) -> bool {
        self.0 & Self::SUBDWORD_BIT != 0
    }

    /// Size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u8 {
        let size = self.0 & Self::SIZE_MASK;

        match self.is_subdword() {
            true => size,
            false => size * DWORD_BYTES,
        }
    }

    /// Size in dwords, rounded up.
    #[must_use]
    pub const fn size(self) -> u8 {
        self.bytes().div_ceil(DWORD_BYTES)
    }

    /// The same byte size in the other file, or in the same file with a different size.
    #[must_use]
    pub const fn with_ty(self, ty: RegType) -> Self {
        Self::get(ty, self.bytes())
    }
}

impl fmt::Display for RegClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.is_subdword() {
            true => write!(f, "{}{}b", self.ty(), self.bytes()),
            false => write!(f, "{}{}", self.ty(), self.size()),
        }
    }
}

impl fmt::Debug for RegClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegClass").field(&format_args!("{self}")).finish()
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::{RegClass, RegType};

    #[test]
    fn sizes() {
        assert_eq!(RegClass::S2.bytes(), 8);
        assert_eq!(RegClass::V3.size(), 3);
        assert_eq!(RegClass::V2B.bytes(), 2);
        assert_eq!(RegClass::V2B.size(), 1);
        assert_eq!(RegClass::V6B.size(), 2);
    }

    #[test]
    fn get_rounds_scalar_up() {
        assert_eq!(RegClass::get(RegType::Sgpr, 2), RegClass::S1);
        assert_eq!(RegClass::get(RegType::Sgpr, 6), RegClass::S2);
        assert_eq!(RegClass::get(RegType::Vgpr, 2), RegClass::V2B);
        assert_eq!(RegClass::get(RegType::Vgpr, 8), RegClass::V2);
        assert_eq!(RegClass::get(RegType::Sgpr, 128).size(), 32);
    }

    #[test]
    fn subdword_is_per_lane() {
        assert_eq!(RegClass::V1B.ty(), RegType::Vgpr);
        assert!(RegClass::V1B.is_subdword());
        assert!(!RegClass::V1.is_subdword());
        assert!(!RegClass::S1.is_subdword());
    }

    #[test]
    fn display() {
        let classes = [RegClass::S1, RegClass::S8, RegClass::V4, RegClass::V2B, RegClass::V6B];
        let text = classes.map(|it| it.to_string()).join(" ");

        expect!["s1 s8 v4 v2b v6b"].assert_eq(&text);
    }
}

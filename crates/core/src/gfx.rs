use core::fmt;
use core::str::FromStr;

use crate::RegClass;

/// Hardware generation, ordered oldest to newest.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum GfxLevel {
    Gfx6,
    Gfx7,
    Gfx8,
    Gfx9,
    Gfx10,
    Gfx10_3,
    Gfx11,
    Gfx12,
}

impl GfxLevel {
    pub const ALL: [Self; 8] = [
        Self::Gfx6,
        Self::Gfx7,
        Self::Gfx8,
        Self::Gfx9,
        Self::Gfx10,
        Self::Gfx10_3,
        Self::Gfx11,
        Self::Gfx12,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gfx6 => "gfx6",
            Self::Gfx7 => "gfx7",
            Self::Gfx8 => "gfx8",
            Self::Gfx9 => "gfx9",
            Self::Gfx10 => "gfx10",
            Self::Gfx10_3 => "gfx10.3",
            Self::Gfx11 => "gfx11",
            Self::Gfx12 => "gfx12",
        }
    }

    /// Wave32 only exists from gfx10 onwards.
    #[must_use]
    pub fn supports(self, wave_size: WaveSize) -> bool {
        match wave_size {
            WaveSize::W64 => true,
            WaveSize::W32 => self >= Self::Gfx10,
        }
    }
}

impl fmt::Display for GfxLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GfxLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|it| it.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown hardware generation `{s}`"))
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum WaveSize {
    W32,
    W64,
}

impl WaveSize {
    #[must_use]
    pub const fn lanes(self) -> u8 {
        match self {
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    /// The scalar register class wide enough to hold one bit per lane.
    #[must_use]
    pub const fn lane_mask(self) -> RegClass {
        match self {
            Self::W32 => RegClass::S1,
            Self::W64 => RegClass::S2,
        }
    }
}

impl FromStr for WaveSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "32" => Ok(Self::W32),
            "64" => Ok(Self::W64),
            _ => Err(format!("invalid wave size `{s}` (expected 32 or 64)")),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
            Self::Compute => f.write_str("compute"),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertex" | "vs" => Ok(Self::Vertex),
            "fragment" | "fs" => Ok(Self::Fragment),
            "compute" | "cs" => Ok(Self::Compute),
            _ => Err(format!("unknown shader stage `{s}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GfxLevel, WaveSize};
    use crate::RegClass;

    #[test]
    fn levels_are_ordered() {
        assert!(GfxLevel::Gfx6 < GfxLevel::Gfx9);
        assert!(GfxLevel::Gfx10 < GfxLevel::Gfx10_3);
        assert!(GfxLevel::Gfx11 < GfxLevel::Gfx12);
    }

    #[test]
    fn parse_level() {
        assert_eq!("gfx10.3".parse::<GfxLevel>(), Ok(GfxLevel::Gfx10_3));
        assert_eq!("GFX8".parse::<GfxLevel>(), Ok(GfxLevel::Gfx8));
        assert!("gfx13".parse::<GfxLevel>().is_err());
    }

    #[test]
    fn wave32_needs_gfx10() {
        assert!(!GfxLevel::Gfx9.supports(WaveSize::W32));
        assert!(GfxLevel::Gfx10.supports(WaveSize::W32));
        assert!(GfxLevel::Gfx6.supports(WaveSize::W64));
    }

    #[test]
    fn lane_mask_width() {
        assert_eq!(WaveSize::W32.lane_mask(), RegClass::S1);
        assert_eq!(WaveSize::W64.lane_mask(), RegClass::S2);
    }
}

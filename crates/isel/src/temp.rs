use std::fmt;

use wavesel_core::{RegClass, RegType};

use crate::TempId;

/// An immutable SSA value: an id plus the register class it lives in.
///
/// Only the [`Program`](crate::Program) hands these out.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct Temp {
    id: TempId,
    rc: RegClass,
}

static_assertions::assert_eq_size!(Temp, u64);

impl Temp {
    pub(crate) const fn new(id: TempId, rc: RegClass) -> Self {
        Self { id, rc }
    }

    #[must_use]
    #[inline(always)]
    pub const fn id(self) -> TempId {
        self.id
    }

    #[must_use]
    #[inline(always)]
    pub const fn rc(self) -> RegClass {
        self.rc
    }

    #[must_use]
    pub const fn ty(self) -> RegType {
        self.rc.ty()
    }

    #[must_use]
    pub const fn bytes(self) -> u8 {
        self.rc.bytes()
    }

    #[must_use]
    pub const fn size(self) -> u8 {
        self.rc.size()
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.id.fmt(f)
    }
}

/// Registers some operands and definitions are pinned to.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum FixedReg {
    /// The scalar condition code.
    Scc,
}

impl fmt::Display for FixedReg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Scc => f.write_str("scc"),
        }
    }
}

/// An inline constant of 1 to 8 bytes.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct Constant {
    bytes: u8,
    value: u64,
}

impl Constant {
    /// `value` truncated to `bytes` bytes.
    #[must_use]
    pub const fn new(bytes: u8, value: u64) -> Self {
        assert!(bytes > 0 && bytes <= 8, "constants are 1 to 8 bytes");

        let value = match bytes {
            8 => value,
            _ => value & ((1 << (bytes as u32 * 8)) - 1),
        };

        Self { bytes, value }
    }

    #[must_use]
    pub const fn zero(bytes: u8) -> Self {
        Self::new(bytes, 0)
    }

    #[must_use]
    pub const fn c32(value: u32) -> Self {
        Self::new(4, value as u64)
    }

    #[must_use]
    pub const fn bytes(self) -> u8 {
        self.bytes
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.value
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.value)?;

        if self.bytes != 4 {
            write!(f, ":{}b", self.bytes)?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Operand {
    Temp(Temp),
    Fixed(Temp, FixedReg),
    Const(Constant),
    /// Any bits at all.
    Undef(RegClass),
    /// The active lane mask, as a value of the wave's lane mask class.
    Exec(RegClass),
}

impl Operand {
    #[must_use]
    pub const fn bytes(&self) -> u8 {
        match self {
            Self::Temp(temp) | Self::Fixed(temp, _) => temp.bytes(),
            Self::Const(constant) => constant.bytes(),
            Self::Undef(rc) | Self::Exec(rc) => rc.bytes(),
        }
    }

    #[must_use]
    pub const fn temp(&self) -> Option<Temp> {
        match self {
            Self::Temp(temp) | Self::Fixed(temp, _) => Some(*temp),
            Self::Const(_) | Self::Undef(_) | Self::Exec(_) => None,
        }
    }
}

impl From<Temp> for Operand {
    fn from(temp: Temp) -> Self {
        Self::Temp(temp)
    }
}

impl From<Constant> for Operand {
    fn from(constant: Constant) -> Self {
        Self::Const(constant)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Temp(temp) => temp.fmt(f),
            Self::Fixed(temp, reg) => write!(f, "{temp}:{reg}"),
            Self::Const(constant) => constant.fmt(f),
            Self::Undef(_) => f.write_str("undef"),
            Self::Exec(_) => f.write_str("exec"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct Definition {
    temp: Temp,
    fixed: Option<FixedReg>,
}

impl Definition {
    #[must_use]
    pub const fn new(temp: Temp) -> Self {
        Self { temp, fixed: None }
    }

    #[must_use]
    pub const fn fixed(temp: Temp, reg: FixedReg) -> Self {
        Self { temp, fixed: Some(reg) }
    }

    #[must_use]
    pub const fn temp(self) -> Temp {
        self.temp
    }

    #[must_use]
    pub const fn fixed_reg(self) -> Option<FixedReg> {
        self.fixed
    }
}

impl From<Temp> for Definition {
    fn from(temp: Temp) -> Self {
        Self::new(temp)
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.fixed {
            Some(reg) => write!(f, "{}:{reg}", self.temp),
            None => write!(f, "{}:{}", self.temp, self.temp.rc()),
        }
    }
}

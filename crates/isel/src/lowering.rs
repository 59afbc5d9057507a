//! Which machine instruction implements an ALU operation, as a declarative table.

use std::ops::RangeInclusive;

use wavesel_core::{GfxLevel, Opcode, RegClass, RegType};
use wavesel_ir::AluOp;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct RuleKey {
    pub op: AluOp,
    /// Width of the sources.
    pub bits: u8,
    /// Register file the operation runs in.
    pub ty: RegType,
    pub gfx: GfxLevel,
}

/// How to emit an operation.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Lowering {
    pub opcode: Opcode,
    /// The instruction also defines `scc`.
    pub writes_scc: bool,
    /// The instruction takes its two sources in the opposite order.
    pub reversed: bool,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Rule {
    pub op: AluOp,
    pub bits: u8,
    pub ty: RegType,
    pub gfx: RangeInclusive<GfxLevel>,
    pub opcode: Opcode,
    pub writes_scc: bool,
    pub reversed: bool,
}

impl Rule {
    #[must_use]
    pub fn matches(&self, key: &RuleKey) -> bool {
        self.op == key.op && self.bits == key.bits && self.ty == key.ty && self.gfx.contains(&key.gfx)
    }

    #[must_use]
    pub const fn lowering(&self) -> Lowering {
        Lowering { opcode: self.opcode, writes_scc: self.writes_scc, reversed: self.reversed }
    }
}

pub trait LoweringTable {
    fn lookup(&self, key: &RuleKey) -> Option<Lowering>;
}

/// The first matching rule wins.
impl LoweringTable for [Rule] {
    fn lookup(&self, key: &RuleKey) -> Option<Lowering> {
        self.iter().find(|rule| rule.matches(key)).map(Rule::lowering)
    }
}

impl LoweringTable for Vec<Rule> {
    fn lookup(&self, key: &RuleKey) -> Option<Lowering> {
        self.as_slice().lookup(key)
    }
}

const ALL: RangeInclusive<GfxLevel> = GfxLevel::Gfx6..=GfxLevel::Gfx12;
const PRE_GFX9: RangeInclusive<GfxLevel> = GfxLevel::Gfx6..=GfxLevel::Gfx8;
const GFX8_PLUS: RangeInclusive<GfxLevel> = GfxLevel::Gfx8..=GfxLevel::Gfx12;
const GFX9_PLUS: RangeInclusive<GfxLevel> = GfxLevel::Gfx9..=GfxLevel::Gfx12;

macro_rules! rules {
    ($($op:ident [$($bits:literal),+] $ty:ident $gfx:ident => $opcode:ident $flags:tt;)*) => {
        &[$($(
            Rule {
                op: AluOp::$op,
                bits: $bits,
                ty: RegType::$ty,
                gfx: $gfx,
                opcode: Opcode::$opcode,
                writes_scc: rules!(@has scc $flags),
                reversed: rules!(@has rev $flags),
            },
        )+)*]
    };

    (@has $want:ident []) => { false };
    (@has scc [scc $($rest:ident)*]) => { true };
    (@has rev [rev $($rest:ident)*]) => { true };
    (@has $want:ident [$other:ident $($rest:ident)*]) => { rules!(@has $want [$($rest)*]) };
}

/// The built in table.
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultLowering;

impl DefaultLowering {
    pub const RULES: &'static [Rule] = rules! {
        Add [32] Vgpr PRE_GFX9 => VAddCoU32 [];
        Add [32] Vgpr GFX9_PLUS => VAddU32 [];
        Add [16] Vgpr GFX8_PLUS => VAddU16 [];
        Sub [32] Vgpr PRE_GFX9 => VSubCoU32 [];
        Sub [32] Vgpr GFX9_PLUS => VSubU32 [];
        Sub [16] Vgpr GFX8_PLUS => VSubU16 [];
        Mul [32] Vgpr ALL => VMulLoU32 [];
        Mul [16] Vgpr GFX8_PLUS => VMulLoU16 [];
        And [8, 16, 32] Vgpr ALL => VAndB32 [];
        Or [8, 16, 32] Vgpr ALL => VOrB32 [];
        Xor [8, 16, 32] Vgpr ALL => VXorB32 [];
        Shl [32] Vgpr ALL => VLshlrevB32 [rev];
        Shl [16] Vgpr GFX8_PLUS => VLshlrevB16 [rev];
        Shr [32] Vgpr ALL => VLshrrevB32 [rev];
        Ishr [32] Vgpr ALL => VAshrrevI32 [rev];
        Eq [32] Vgpr ALL => VCmpEqU32 [];
        Ult [32] Vgpr ALL => VCmpLtU32 [];
        Fadd [32] Vgpr ALL => VAddF32 [];
        Fadd [16] Vgpr GFX8_PLUS => VAddF16 [];
        Fmul [32] Vgpr ALL => VMulF32 [];
        Fmul [16] Vgpr GFX8_PLUS => VMulF16 [];

        Add [8, 16, 32] Sgpr ALL => SAddU32 [scc];
        Sub [8, 16, 32] Sgpr ALL => SSubU32 [scc];
        Mul [8, 16, 32] Sgpr ALL => SMulI32 [];
        And [8, 16, 32] Sgpr ALL => SAndB32 [scc];
        Or [8, 16, 32] Sgpr ALL => SOrB32 [scc];
        Xor [8, 16, 32] Sgpr ALL => SXorB32 [scc];
        Shl [8, 16, 32] Sgpr ALL => SLshlB32 [scc];
        Shr [32] Sgpr ALL => SLshrB32 [scc];
        Ishr [32] Sgpr ALL => SAshrI32 [scc];
        Eq [32] Sgpr ALL => SCmpEqU32 [scc];
        Ult [32] Sgpr ALL => SCmpLtU32 [scc];
    };
}

impl LoweringTable for DefaultLowering {
    fn lookup(&self, key: &RuleKey) -> Option<Lowering> {
        Self::RULES.lookup(key)
    }
}

/// Boolean logic on lane masks works on the whole mask at once, whatever the divergence.
#[must_use]
pub fn lane_mask_op(op: AluOp, lane_mask: RegClass) -> Option<Opcode> {
    let wide = lane_mask == RegClass::S2;

    let opcode = match (op, wide) {
        (AluOp::And, false) => Opcode::SAndB32,
        (AluOp::And, true) => Opcode::SAndB64,
        (AluOp::Or, false) => Opcode::SOrB32,
        (AluOp::Or, true) => Opcode::SOrB64,
        (AluOp::Xor, false) => Opcode::SXorB32,
        (AluOp::Xor, true) => Opcode::SXorB64,
        _ => return None,
    };

    Some(opcode)
}

#[cfg(test)]
mod tests;

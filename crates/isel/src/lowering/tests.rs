use wavesel_core::{GfxLevel, Opcode, RegClass, RegType};
use wavesel_ir::AluOp;

use super::{DefaultLowering, Lowering, LoweringTable, Rule, RuleKey, lane_mask_op};

fn key(op: AluOp, bits: u8, ty: RegType, gfx: GfxLevel) -> RuleKey {
    RuleKey { op, bits, ty, gfx }
}

#[test]
fn generation_ranges() {
    let pre = DefaultLowering.lookup(&key(AluOp::Add, 32, RegType::Vgpr, GfxLevel::Gfx8));
    let post = DefaultLowering.lookup(&key(AluOp::Add, 32, RegType::Vgpr, GfxLevel::Gfx9));

    assert_eq!(pre.map(|it| it.opcode), Some(Opcode::VAddCoU32));
    assert_eq!(post.map(|it| it.opcode), Some(Opcode::VAddU32));

    // no 16-bit per-lane arithmetic before gfx8
    assert_eq!(DefaultLowering.lookup(&key(AluOp::Add, 16, RegType::Vgpr, GfxLevel::Gfx7)), None);
}

#[test]
fn flags() {
    assert_eq!(
        DefaultLowering.lookup(&key(AluOp::Shl, 32, RegType::Vgpr, GfxLevel::Gfx10)),
        Some(Lowering { opcode: Opcode::VLshlrevB32, writes_scc: false, reversed: true })
    );

    assert_eq!(
        DefaultLowering.lookup(&key(AluOp::Add, 8, RegType::Sgpr, GfxLevel::Gfx6)),
        Some(Lowering { opcode: Opcode::SAddU32, writes_scc: true, reversed: false })
    );

    assert_eq!(
        DefaultLowering.lookup(&key(AluOp::Mul, 32, RegType::Sgpr, GfxLevel::Gfx6)),
        Some(Lowering { opcode: Opcode::SMulI32, writes_scc: false, reversed: false })
    );
}

#[test]
fn no_64_bit_rules() {
    for &op in AluOp::ALL {
        for ty in [RegType::Sgpr, RegType::Vgpr] {
            for gfx in GfxLevel::ALL {
                assert_eq!(DefaultLowering.lookup(&key(op, 64, ty, gfx)), None, "{op} {ty} {gfx}");
            }
        }
    }
}

#[test]
fn custom_table_first_match_wins() {
    let rules = vec![
        Rule {
            op: AluOp::Add,
            bits: 32,
            ty: RegType::Vgpr,
            gfx: GfxLevel::Gfx10..=GfxLevel::Gfx10,
            opcode: Opcode::VAddCoU32,
            writes_scc: false,
            reversed: false,
        },
        Rule {
            op: AluOp::Add,
            bits: 32,
            ty: RegType::Vgpr,
            gfx: GfxLevel::Gfx6..=GfxLevel::Gfx12,
            opcode: Opcode::VAddU32,
            writes_scc: false,
            reversed: false,
        },
    ];

    let at = |gfx| rules.lookup(&key(AluOp::Add, 32, RegType::Vgpr, gfx)).map(|it| it.opcode);

    assert_eq!(at(GfxLevel::Gfx10), Some(Opcode::VAddCoU32));
    assert_eq!(at(GfxLevel::Gfx11), Some(Opcode::VAddU32));
}

#[test]
fn lane_mask_logic() {
    assert_eq!(lane_mask_op(AluOp::And, RegClass::S2), Some(Opcode::SAndB64));
    assert_eq!(lane_mask_op(AluOp::Xor, RegClass::S1), Some(Opcode::SXorB32));
    assert_eq!(lane_mask_op(AluOp::Add, RegClass::S2), None);
}

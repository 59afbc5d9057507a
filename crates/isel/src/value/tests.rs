use wavesel_core::{Opcode, RegClass, RegType};

use crate::eval::Lane;
use crate::{Context, Options, Temp};

fn count(ctx: &Context, opcode: Opcode) -> usize {
    let block = ctx.program().block(ctx.current_block());
    block.instructions.iter().filter(|it| it.opcode == opcode).count()
}

#[track_caller]
fn run(ctx: &Context, lane: &mut Lane) {
    let block = ctx.program().block(ctx.current_block());
    lane.run(&block.instructions).unwrap();
}

#[test]
fn repeated_extracts_reuse_the_split() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V2);

    let first = ctx.extract_component(src, 1, RegClass::V1);
    let second = ctx.extract_component(src, 1, RegClass::V1);
    let other = ctx.extract_component(src, 0, RegClass::V1);

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(count(&ctx, Opcode::PSplitVector), 1);
    assert_eq!(ctx.cache().get(src), Some(&[other, first][..]));
}

#[test]
fn scalar_subdword_extract_promotes_once() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::S1);

    let b1 = ctx.extract_component(src, 1, RegClass::V1B);
    let b2 = ctx.extract_component(src, 2, RegClass::V1B);

    assert_eq!(count(&ctx, Opcode::PParallelcopy), 1);
    assert_eq!(count(&ctx, Opcode::PSplitVector), 1);

    let mut lane = Lane::new();
    lane.set(src, &[10, 11, 12, 13]);
    run(&ctx, &mut lane);

    assert_eq!(lane.get(b1), Some(&[11][..]));
    assert_eq!(lane.get(b2), Some(&[12][..]));
}

#[test]
fn extracts_land_after_the_definition() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V2);
    ctx.copy(src, crate::Constant::new(8, 0x0807_0605_0403_0201));

    let unrelated = ctx.tmp(RegClass::V1);
    ctx.copy(unrelated, crate::Constant::zero(4));

    let hi = ctx.extract_component(src, 1, RegClass::V1);

    let instrs = &ctx.program().block(ctx.current_block()).instructions;
    let split = instrs.iter().position(|it| it.opcode == Opcode::PSplitVector).unwrap();
    assert!(instrs[split - 1].defines(src.id()));

    let mut lane = Lane::new();
    run(&ctx, &mut lane);
    assert_eq!(lane.get(hi), Some(&[5, 6, 7, 8][..]));
}

#[test]
fn expand_places_components() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V2);
    let filled = ctx.tmp(RegClass::V4);
    let loose = ctx.tmp(RegClass::V4);

    ctx.expand(src, filled, 4, 0b1010, true);
    ctx.expand(src, loose, 4, 0b0011, false);

    let mut lane = Lane::new();
    lane.set(src, &[1, 2, 3, 4, 5, 6, 7, 8]);
    run(&ctx, &mut lane);

    assert_eq!(lane.get(filled), Some(&[0, 0, 0, 0, 1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8][..]));
    assert_eq!(lane.get(loose).map(|it| &it[..8]), Some(&[1, 2, 3, 4, 5, 6, 7, 8][..]));

    // the pieces are known, so taking `filled` apart again costs nothing
    let before = ctx.program().block(ctx.current_block()).instructions.len();
    let _ = ctx.extract_component(filled, 3, RegClass::V1);
    assert_eq!(ctx.program().block(ctx.current_block()).instructions.len(), before);
}

#[test]
fn expand_into_packed_scalar() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V2);
    let dst = ctx.tmp(RegClass::S2);

    ctx.expand(src, dst, 4, 0b0110, true);

    let mut lane = Lane::new();
    lane.set(src, &[1, 2, 3, 4, 5, 6, 7, 8]);
    run(&ctx, &mut lane);

    assert_eq!(lane.get(dst), Some(&[0, 0, 1, 2, 3, 4, 0, 0][..]));
}

#[test]
fn convert_width_every_byte() {
    for ty in [RegType::Sgpr, RegType::Vgpr] {
        for dst_bits in [16, 32, 64] {
            for sign_extend in [false, true] {
                for value in 0..=u8::MAX {
                    let mut ctx = Context::new(&Options::default());
                    let src = ctx.tmp(RegClass::get(ty, 1));
                    let dst = ctx.convert_width(src, 8, dst_bits, sign_extend);

                    let mut lane = Lane::new();
                    match ty {
                        // garbage above the low byte has to be ignored
                        RegType::Sgpr => lane.set(src, &[value, 0xab, 0xcd, 0xef]),
                        RegType::Vgpr => lane.set(src, &[value]),
                    }

                    run(&ctx, &mut lane);

                    let expected = match sign_extend {
                        true => value as i8 as i64 as u64,
                        false => u64::from(value),
                    };

                    let len = usize::from(dst_bits / 8);
                    assert_eq!(
                        lane.get(dst).map(|it| &it[..len]),
                        Some(&expected.to_le_bytes()[..len]),
                        "{ty} {value:#x} to {dst_bits} bits, sign_extend: {sign_extend}"
                    );
                }
            }
        }
    }
}

#[test]
fn sign_extend_dword() {
    for rc in [RegClass::S1, RegClass::V1] {
        let mut ctx = Context::new(&Options::default());
        let src = ctx.tmp(rc);
        let dst = ctx.convert_width(src, 32, 64, true);
        assert_eq!(dst.size(), 2);

        let mut lane = Lane::new();
        lane.set(src, &0x8000_0001_u32.to_le_bytes());
        run(&ctx, &mut lane);

        assert_eq!(lane.get(dst), Some(&[1, 0, 0, 0x80, 0xff, 0xff, 0xff, 0xff][..]));
    }
}

#[test]
fn truncate() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V1);
    let dst = ctx.convert_width(src, 32, 16, false);
    assert_eq!(dst.rc(), RegClass::V2B);

    let mut lane = Lane::new();
    lane.set(src, &[1, 2, 3, 4]);
    run(&ctx, &mut lane);

    assert_eq!(lane.get(dst), Some(&[1, 2][..]));
}

#[test]
#[should_panic = "shrinking integers is not supported for signed inputs"]
fn signed_shrink() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V1);
    let _: Temp = ctx.convert_width(src, 32, 16, true);
}

#[test]
fn split_matches_full_expand() {
    for (rc, n) in [(RegClass::V4, 4), (RegClass::V4, 2), (RegClass::V2, 4), (RegClass::V3B, 3)] {
        let mut ctx = Context::new(&Options::default());
        let src = ctx.tmp(rc);
        let expanded = ctx.tmp(rc);

        ctx.split_into(src, n);
        let part_rc = ctx.cache().get(src).unwrap()[0].rc();
        let parts: Vec<Temp> = (0..n).map(|idx| ctx.extract_component(src, idx, part_rc)).collect();
        ctx.expand(src, expanded, n, (1 << n) - 1, false);

        let bytes: Vec<u8> = (1..=rc.bytes()).collect();
        let mut lane = Lane::new();
        lane.set(src, &bytes);
        run(&ctx, &mut lane);

        let joined: Vec<u8> = parts.iter().flat_map(|&part| lane.get(part).unwrap().to_vec()).collect();
        assert_eq!(joined, bytes, "{rc:?} in {n} parts");
        assert_eq!(lane.get(expanded), Some(bytes.as_slice()), "{rc:?} in {n} parts");
    }
}

#[test]
fn widen_then_narrow() {
    for ty in [RegType::Sgpr, RegType::Vgpr] {
        for value in 0..=u8::MAX {
            let mut ctx = Context::new(&Options::default());
            let src = ctx.tmp(RegClass::get(ty, 1));
            let wide = ctx.convert_width(src, 8, 32, true);
            let narrow = ctx.convert_width(wide, 32, 8, false);

            let mut lane = Lane::new();
            match ty {
                RegType::Sgpr => lane.set(src, &[value, 0, 0, 0]),
                RegType::Vgpr => lane.set(src, &[value]),
            }

            run(&ctx, &mut lane);

            assert_eq!(lane.get(narrow).map(|it| it[0]), Some(value), "{ty} {value:#x}");
        }
    }
}

#[test]
fn split_subdword_into_halves() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V6B);

    ctx.split_into(src, 2);

    let parts = ctx.cache().get(src).unwrap().to_vec();
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|it| it.rc() == RegClass::V3B));

    let mut lane = Lane::new();
    lane.set(src, &[1, 2, 3, 4, 5, 6]);
    run(&ctx, &mut lane);

    assert_eq!(lane.get(parts[0]), Some(&[1, 2, 3][..]));
    assert_eq!(lane.get(parts[1]), Some(&[4, 5, 6][..]));
}

#[test]
#[should_panic = "into zero parts"]
fn split_into_nothing() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V2);
    ctx.split_into(src, 0);
}

#[test]
fn expand_without_components() {
    let mut ctx = Context::new(&Options::default());
    let src = ctx.tmp(RegClass::V1);
    let dst = ctx.tmp(RegClass::V2);

    ctx.expand(src, dst, 2, 0, true);

    assert_eq!(count(&ctx, Opcode::PSplitVector), 0);
    assert_eq!(ctx.cache().get(src), None);

    let mut lane = Lane::new();
    run(&ctx, &mut lane);
    assert_eq!(lane.get(dst), Some(&[0; 8][..]));
}

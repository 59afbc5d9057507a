use expect_test::expect;
use wavesel_core::{BranchHint, RegClass};

use super::{ExecInfo, SkipPoint};
use crate::validate::assert_well_formed;
use crate::{BlockIdx, BlockKind, Context, Options};

fn bb(idx: u32) -> BlockIdx {
    BlockIdx(idx)
}

fn exec_info(bits: u8) -> ExecInfo {
    ExecInfo {
        potentially_empty_discard: bits & 1 != 0,
        potentially_empty_break: bits & 2 != 0,
        potentially_empty_continue: bits & 4 != 0,
    }
}

#[test]
fn exec_info_combines_by_or() {
    for a in 0..8 {
        for b in 0..8 {
            let mut info = exec_info(a);
            info.combine(exec_info(b));

            assert_eq!(info, exec_info(a | b));
            assert_eq!(info, exec_info(b).combined(exec_info(a)));
            assert_eq!(info.empty(), a | b != 0);
        }

        assert_eq!(exec_info(a).combined(exec_info(a)), exec_info(a));
    }
}

#[test]
fn uniform_if_else() {
    let mut ctx = Context::new(&Options::default());
    let cond = ctx.tmp(RegClass::S1);

    let mut scope = ctx.begin_uniform_if_then(Some(cond));
    ctx.begin_uniform_if_else(&mut scope, true);
    ctx.end_uniform_if(scope, true);

    assert_eq!(ctx.program().next_uniform_if_depth, 0);

    let program = ctx.finish();
    assert_well_formed(&program);

    expect![[r#"
        BB0 [uniform top_level] logical_preds() linear_preds()
            p_logical_start
            p_logical_end
            p_cbranch_z %0:scc
        BB1 [uniform] logical_preds(BB0) linear_preds(BB0)
            p_logical_start
            p_logical_end
            p_branch
        BB2 [uniform] logical_preds(BB0) linear_preds(BB0)
            p_logical_start
            p_logical_end
            p_branch
        BB3 [uniform top_level] logical_preds(BB1, BB2) linear_preds(BB1, BB2)
            p_logical_start
            p_logical_end
            s_endpgm
    "#]]
    .assert_eq(&program.display().to_string());
}

#[test]
fn divergent_if_without_else() {
    let mut ctx = Context::new(&Options::default());
    let cond = ctx.tmp(ctx.program().lane_mask);

    let mut scope = ctx.begin_divergent_if_then(cond, BranchHint::None);
    assert!(ctx.cf().in_divergent_cf);
    assert_eq!(ctx.program().block(ctx.current_block()).divergent_if_logical_depth, 1);

    ctx.begin_divergent_if_else(&mut scope, BranchHint::None);
    ctx.end_divergent_if(scope);

    assert!(!ctx.cf().in_divergent_cf);
    assert_eq!(ctx.program().next_divergent_if_logical_depth, 0);

    let program = ctx.finish();
    assert_well_formed(&program);
    assert_eq!(program.blocks.len(), 7);

    let invert = program.block(bb(3));
    assert!(invert.kind.contains(BlockKind::INVERT));
    assert_eq!(invert.linear_preds, [bb(1), bb(2)]);
    assert!(invert.logical_preds.is_empty());

    let merge = program.block(bb(6));
    assert!(merge.kind.contains(BlockKind::MERGE | BlockKind::TOP_LEVEL));
    assert_eq!(merge.logical_preds, [bb(1), bb(4)]);
    assert_eq!(merge.linear_preds, [bb(4), bb(5)]);
}

#[test]
fn loop_with_divergent_break() {
    let mut ctx = Context::new(&Options::default());
    let cond = ctx.tmp(ctx.program().lane_mask);

    let lp = ctx.begin_loop();
    assert_eq!(ctx.program().block(ctx.current_block()).loop_nest_depth, 1);

    let mut scope = ctx.begin_divergent_if_then(cond, BranchHint::None);
    ctx.emit_loop_break();
    ctx.begin_divergent_if_else(&mut scope, BranchHint::None);
    ctx.end_divergent_if(scope);

    let cf = *ctx.cf();
    assert!(cf.parent_loop.has_divergent_break);
    assert!(cf.in_divergent_cf);
    assert_eq!(
        cf.in_divergent_cf,
        cf.parent_loop.has_divergent_break || cf.parent_loop.has_divergent_continue
    );

    ctx.end_loop(lp);

    assert!(!ctx.cf().in_divergent_cf);
    assert!(!ctx.cf().in_loop());
    assert_eq!(ctx.program().next_loop_depth, 0);

    let exit = ctx.current_block();
    let program = ctx.finish();
    assert_well_formed(&program);

    let exit = program.block(exit);
    assert!(exit.kind.contains(BlockKind::LOOP_EXIT | BlockKind::TOP_LEVEL));
    assert_eq!(exit.loop_nest_depth, 0);
    assert_eq!(exit.logical_preds, [bb(2)]);
    assert_eq!(exit.linear_preds, [bb(3)]);

    let header = program.block(bb(1));
    assert!(header.kind.contains(BlockKind::LOOP_HEADER));
    assert_eq!(header.linear_preds, [bb(0), bb(9)]);
}

#[test]
fn uniform_break_ends_the_body() {
    let mut ctx = Context::new(&Options::default());

    ctx.loop_scope(|ctx| {
        ctx.emit_loop_break();
        assert!(ctx.cf().has_branch);
        Ok::<_, ()>(())
    })
    .unwrap();

    let program = ctx.finish();
    assert_well_formed(&program);

    // the body never loops back, so the header's only predecessor is the preheader
    assert_eq!(program.block(bb(1)).linear_preds, [bb(0)]);
    assert_eq!(program.block(bb(2)).logical_preds, [bb(1)]);
    assert!(program.block(bb(1)).kind.contains(BlockKind::BREAK | BlockKind::UNIFORM));
}

#[test]
fn failed_arm_restores_state() {
    let mut ctx = Context::new(&Options::default());
    let cond = ctx.tmp(RegClass::S1);

    let result = ctx.uniform_if(cond, |_, arm| match arm {
        crate::Arm::Then => Ok(()),
        crate::Arm::Else => Err("nope"),
    });

    assert_eq!(result, Err("nope"));
    assert_eq!(ctx.program().next_uniform_if_depth, 0);
    assert_eq!(*ctx.cf(), Default::default());
}

#[test]
fn divergent_discard_skips_the_rest() {
    let mut ctx = Context::new(&Options { stage: wavesel_core::Stage::Fragment, ..Options::default() });
    let cond = ctx.tmp(ctx.program().lane_mask);

    let mut scope = ctx.begin_divergent_if_then(cond, BranchHint::None);
    ctx.emit_terminate(None, false, SkipPoint { rest_of_block_empty: false, further_cf_empty: false });

    assert!(ctx.program().should_repair_ssa);
    assert!(ctx.cf().had_divergent_discard);
    // inside the skip the lanes are known to be there again
    assert!(!ctx.cf().exec.empty());

    ctx.end_empty_exec_skip();
    assert!(ctx.cf().exec.potentially_empty_discard);

    ctx.begin_divergent_if_else(&mut scope, BranchHint::None);
    ctx.end_divergent_if(scope);

    assert!(!ctx.cf().exec.empty());
    assert!(ctx.program().needs_exact);

    let program = ctx.finish();
    assert_well_formed(&program);
    assert!(program.blocks.iter().any(|block| block.kind.contains(BlockKind::USES_DISCARD)));
}

#[test]
#[should_panic = "never enter a loop with an empty exec mask"]
fn loop_with_empty_exec() {
    let mut ctx = Context::new(&Options::default());
    ctx.cf.exec.potentially_empty_discard = true;

    let _scope = ctx.begin_loop();
}

#[test]
#[should_panic = "never enter an if with an empty exec mask"]
fn uniform_if_with_empty_exec() {
    let mut ctx = Context::new(&Options::default());
    let cond = ctx.tmp(RegClass::S1);
    ctx.cf.exec.potentially_empty_discard = true;

    let _scope = ctx.begin_uniform_if_then(Some(cond));
}

#[test]
#[should_panic = "never enter an if with an empty exec mask"]
fn divergent_if_with_empty_exec() {
    let mut ctx = Context::new(&Options::default());
    let cond = ctx.tmp(ctx.program().lane_mask);
    ctx.cf.exec.potentially_empty_break = true;

    let _scope = ctx.begin_divergent_if_then(cond, BranchHint::None);
}

use super::{assert_well_formed, linear_critical_edges};
use crate::{BlockIdx, Context, Options};

#[test]
fn engine_output_is_well_formed() {
    let mut ctx = Context::new(&Options::default());
    let cond = ctx.tmp(ctx.program().lane_mask);

    let mut scope = ctx.begin_divergent_if_then(cond, Default::default());
    ctx.begin_divergent_if_else(&mut scope, Default::default());
    ctx.end_divergent_if(scope);

    let program = ctx.finish();
    assert_well_formed(&program);
    assert!(linear_critical_edges(&program).is_empty());
}

#[test]
fn finds_critical_edges() {
    let mut ctx = Context::new(&Options::default());
    let program = &mut ctx.program;

    let (a, b) = (program.create_and_insert_block(), program.create_and_insert_block());
    let entry = BlockIdx(0);

    // entry branches to both a and b, and a falls through into b
    for (pred, succ) in [(entry, a), (entry, b), (a, b)] {
        program.block_mut(pred).linear_succs.push(succ);
        program.block_mut(succ).linear_preds.push(pred);
    }

    assert_eq!(linear_critical_edges(program), vec![(entry, b)]);
}

#[test]
#[should_panic = "critical edges on the linear graph"]
fn rejects_critical_edges() {
    let mut ctx = Context::new(&Options::default());
    let program = &mut ctx.program;

    let (a, b) = (program.create_and_insert_block(), program.create_and_insert_block());
    let entry = BlockIdx(0);

    for (pred, succ) in [(entry, a), (entry, b), (a, b)] {
        program.block_mut(pred).linear_succs.push(succ);
        program.block_mut(succ).linear_preds.push(pred);
    }

    assert_well_formed(program);
}

#[test]
#[should_panic = "linear predecessors and successors disagree"]
fn rejects_one_sided_edges() {
    let mut ctx = Context::new(&Options::default());
    let program = &mut ctx.program;

    let a = program.create_and_insert_block();
    program.block_mut(a).linear_preds.push(BlockIdx(0));

    assert_well_formed(program);
}

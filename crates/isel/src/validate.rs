//! Structural checks on a finished program.

use wavesel_core::Opcode;

use crate::{BlockIdx, BlockKind, Program};

#[cfg(test)]
mod tests;

/// Edges on the linear graph from a block with several successors to a block with several
/// predecessors.
#[must_use]
pub fn linear_critical_edges(program: &Program) -> Vec<(BlockIdx, BlockIdx)> {
    program
        .blocks
        .iter()
        .filter(|block| block.linear_succs.len() > 1)
        .flat_map(|block| {
            block
                .linear_succs
                .iter()
                .filter(|succ| program.block(**succ).linear_preds.len() > 1)
                .map(move |&succ| (block.index, succ))
        })
        .collect()
}

fn edges(program: &Program, list: impl Fn(&crate::Block) -> &[BlockIdx], forward: bool) -> Vec<(BlockIdx, BlockIdx)> {
    let mut edges: Vec<_> = program
        .blocks
        .iter()
        .flat_map(|block| {
            list(block).iter().map(move |&other| match forward {
                true => (block.index, other),
                false => (other, block.index),
            })
        })
        .collect();

    edges.sort_unstable();

    edges
}

/// Panics with a description of the first broken rule.
#[track_caller]
pub fn assert_well_formed(program: &Program) {
    for (idx, block) in program.blocks.iter().enumerate() {
        assert_eq!(block.index.index(), idx, "block at position {idx} is numbered {}", block.index);
    }

    assert_eq!(
        edges(program, |it| &it.logical_preds, false),
        edges(program, |it| &it.logical_succs, true),
        "logical predecessors and successors disagree"
    );

    assert_eq!(
        edges(program, |it| &it.linear_preds, false),
        edges(program, |it| &it.linear_succs, true),
        "linear predecessors and successors disagree"
    );

    for block in program.blocks.iter().skip(1) {
        assert!(!block.linear_preds.is_empty(), "{} is unreachable", block.index);

        if block.kind.intersects(BlockKind::MERGE | BlockKind::LOOP_EXIT) {
            assert!(!block.logical_preds.is_empty(), "{} has no logical predecessor", block.index);
        }
    }

    let critical = linear_critical_edges(program);
    assert!(critical.is_empty(), "critical edges on the linear graph: {critical:?}");

    for block in &program.blocks {
        let phis = block.leading_phis();

        for (pos, instr) in block.instructions.iter().enumerate() {
            if !instr.opcode.is_phi() {
                continue;
            }

            assert!(pos < phis, "{}: phi after the top of the block: `{instr}`", block.index);

            let preds = match instr.opcode {
                Opcode::PLinearPhi => block.linear_preds.len(),
                _ => block.logical_preds.len(),
            };

            assert_eq!(
                instr.operands.len(),
                preds,
                "{}: phi operand count doesn't match the predecessors: `{instr}`",
                block.index
            );
        }
    }
}

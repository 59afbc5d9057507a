use std::fmt;

use crate::Instruction;

bitflags::bitflags! {
    /// What a block is for, used by the passes after selection.
    #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default)]
    pub struct BlockKind: u16 {
        /// Ends with a branch whose target doesn't depend on the lane.
        const UNIFORM = 1 << 0;
        /// Not nested in any control flow.
        const TOP_LEVEL = 1 << 1;
        const LOOP_PREHEADER = 1 << 2;
        const LOOP_HEADER = 1 << 3;
        const LOOP_EXIT = 1 << 4;
        const CONTINUE = 1 << 5;
        const BREAK = 1 << 6;
        /// Ends with a divergent conditional branch.
        const BRANCH = 1 << 7;
        const MERGE = 1 << 8;
        /// Flips the active lanes from the then-arm to the else-arm of a divergent if.
        const INVERT = 1 << 9;
        const USES_DISCARD = 1 << 10;
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, (name, _)) in self.iter_names().enumerate() {
            if idx != 0 {
                f.write_str(" ")?;
            }

            f.write_str(&name.to_ascii_lowercase())?;
        }

        Ok(())
    }
}

/// Stable index of a block in the [`Program`](crate::Program)'s block list.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord, Default)]
pub struct BlockIdx(pub(crate) u32);

impl BlockIdx {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BB{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub index: BlockIdx,
    pub kind: BlockKind,
    pub instructions: Vec<Instruction>,
    pub logical_preds: Vec<BlockIdx>,
    pub linear_preds: Vec<BlockIdx>,
    pub logical_succs: Vec<BlockIdx>,
    pub linear_succs: Vec<BlockIdx>,
    pub loop_nest_depth: u32,
    pub divergent_if_logical_depth: u32,
    pub uniform_if_depth: u32,
}

impl Block {
    #[must_use]
    pub fn with_kind(kind: BlockKind) -> Self {
        Self { kind, ..Self::default() }
    }

    /// Number of phis at the top of the block.
    #[must_use]
    pub fn leading_phis(&self) -> usize {
        self.instructions.iter().take_while(|it| it.opcode.is_phi()).count()
    }

    #[must_use]
    pub fn display(&self) -> BlockDisplay<'_> {
        BlockDisplay(self)
    }
}

pub struct BlockDisplay<'a>(&'a Block);

fn idx_list(f: &mut fmt::Formatter, list: &[BlockIdx]) -> fmt::Result {
    for (idx, block) in list.iter().enumerate() {
        if idx != 0 {
            f.write_str(", ")?;
        }

        fmt::Display::fmt(block, f)?;
    }

    Ok(())
}

impl fmt::Display for BlockDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let block = self.0;

        write!(f, "{} [{}] logical_preds(", block.index, block.kind)?;
        idx_list(f, &block.logical_preds)?;
        f.write_str(") linear_preds(")?;
        idx_list(f, &block.linear_preds)?;
        writeln!(f, ")")?;

        for instr in &block.instructions {
            writeln!(f, "    {instr}")?;
        }

        Ok(())
    }
}

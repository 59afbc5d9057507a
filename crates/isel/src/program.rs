use std::fmt;

use wavesel_core::{GfxLevel, Opcode, RegClass, Stage, WaveSize};

use crate::{Block, BlockIdx, BlockKind, IdAllocator, Instruction, Options, Temp};

/// Where wide execution was last requested: the instruction index is one past the requesting
/// instruction.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct WqmPoint {
    pub block: BlockIdx,
    pub instruction: usize,
}

/// The selected program: the block arena plus everything later passes need to know about it.
#[derive(Debug)]
pub struct Program {
    pub blocks: Vec<Block>,
    pub gfx_level: GfxLevel,
    pub wave_size: WaveSize,
    pub stage: Stage,
    pub lane_mask: RegClass,
    allocator: IdAllocator,

    pub next_loop_depth: u32,
    pub next_divergent_if_logical_depth: u32,
    pub next_uniform_if_depth: u32,

    /// Some lanes have to keep running as helpers for their quad's neighbours.
    pub needs_wqm: bool,
    /// Some instruction must only run for the lanes that are really active.
    pub needs_exact: bool,
    /// Empty-exec skipping left values whose definitions no longer dominate their uses; a
    /// dominance repair pass has to run before this program can be used.
    pub should_repair_ssa: bool,
    pub wqm_point: Option<WqmPoint>,
}

impl Program {
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            blocks: Vec::new(),
            gfx_level: options.gfx_level,
            wave_size: options.wave_size,
            stage: options.stage,
            lane_mask: options.wave_size.lane_mask(),
            allocator: IdAllocator::new(),
            next_loop_depth: 0,
            next_divergent_if_logical_depth: 0,
            next_uniform_if_depth: 0,
            needs_wqm: false,
            needs_exact: false,
            should_repair_ssa: false,
            wqm_point: None,
        }
    }

    pub fn allocate_tmp(&mut self, rc: RegClass) -> Temp {
        Temp::new(self.allocator.allocate(), rc)
    }

    /// How many values have been allocated.
    #[must_use]
    pub fn temp_count(&self) -> u32 {
        self.allocator.count()
    }

    pub fn create_and_insert_block(&mut self) -> BlockIdx {
        self.insert_block(Block::default())
    }

    /// Appends `block`, stamping its index and the current nesting depths.
    pub fn insert_block(&mut self, mut block: Block) -> BlockIdx {
        let idx = BlockIdx(self.blocks.len() as u32);

        block.index = idx;
        block.loop_nest_depth = self.next_loop_depth;
        block.divergent_if_logical_depth = self.next_divergent_if_logical_depth;
        block.uniform_if_depth = self.next_uniform_if_depth;

        self.blocks.push(block);

        idx
    }

    #[must_use]
    #[track_caller]
    pub fn block(&self, idx: BlockIdx) -> &Block {
        &self.blocks[idx.index()]
    }

    #[track_caller]
    pub fn block_mut(&mut self, idx: BlockIdx) -> &mut Block {
        &mut self.blocks[idx.index()]
    }

    /// Inserts `instr` at `pos` in `block`, keeping the recorded WQM point on the same
    /// instruction.
    pub(crate) fn insert_instruction(&mut self, block: BlockIdx, pos: usize, instr: Instruction) {
        self.block_mut(block).instructions.insert(pos, instr);

        if let Some(point) = &mut self.wqm_point {
            if point.block == block && pos < point.instruction {
                point.instruction += 1;
            }
        }
    }

    /// Inserts the `p_end_wqm` marker where wide execution stops being needed: after the last
    /// request, at the first point that is back at top level and either starts logical code or
    /// memory access, or just finished a discard or demote.
    pub(crate) fn end_wqm(&mut self) {
        if self.stage != Stage::Fragment || !self.needs_wqm || !self.needs_exact {
            return;
        }

        let Some(point) = self.wqm_point else { return };

        let Some(block) = (point.block.index()..self.blocks.len())
            .find(|&idx| self.blocks[idx].kind.contains(BlockKind::TOP_LEVEL))
        else {
            return;
        };

        let instrs = &self.blocks[block].instructions;
        let mut pos = match block == point.block.index() {
            true => point.instruction,
            false => 0,
        };
        while pos < instrs.len() {
            let opcode = instrs[pos].opcode;
            if opcode.is_vmem() || opcode == Opcode::PLogicalStart {
                break;
            }

            pos += 1;

            if matches!(opcode, Opcode::PLogicalEnd | Opcode::PDiscardIf | Opcode::PDemoteToHelper)
            {
                break;
            }
        }

        tracing::debug!(block = %BlockIdx(block as u32), pos, "ending wqm");

        self.blocks[block].instructions.insert(pos, Instruction::bare(Opcode::PEndWqm));
    }

    #[must_use]
    pub fn display(&self) -> ProgramDisplay<'_> {
        ProgramDisplay(self)
    }
}

pub struct ProgramDisplay<'a>(&'a Program);

impl fmt::Display for ProgramDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for block in &self.0.blocks {
            block.display().fmt(f)?;
        }

        Ok(())
    }
}

use std::fmt;

use fnv::FnvHashMap;
use wavesel_core::{Opcode, RegClass};

use crate::cf::{CfContext, IfScope};
use crate::{Block, BlockIdx, BlockKind, DecompositionCache, Instruction, Options, Program, Temp, TempId};

/// A block that has been created but not inserted into the program yet, so it has no index.
///
/// Edges into it are recorded on the block itself and mirrored onto the predecessors once it
/// gets inserted.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct PendingBlock(usize);

impl fmt::Display for PendingBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pending{}", self.0)
    }
}

/// Where an edge goes.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub(crate) enum Target {
    Placed(BlockIdx),
    Pending(PendingBlock),
}

impl From<BlockIdx> for Target {
    fn from(idx: BlockIdx) -> Self {
        Self::Placed(idx)
    }
}

impl From<PendingBlock> for Target {
    fn from(block: PendingBlock) -> Self {
        Self::Pending(block)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Placed(idx) => idx.fmt(f),
            Self::Pending(block) => block.fmt(f),
        }
    }
}

/// The mutable state of one selection: the program under construction, the block currently
/// being appended to, and the control-flow bookkeeping.
pub struct Context {
    pub(crate) program: Program,
    pub(crate) options: Options,
    pub(crate) block: BlockIdx,
    pub(crate) cf: CfContext,
    pub(crate) empty_exec_skip: Option<IfScope>,
    pub(crate) cache: DecompositionCache,
    /// Copies and extracts already made of a value, keyed by (value, component, class).
    pub(crate) derived: FnvHashMap<(TempId, u8, RegClass), Temp>,
    def_sites: FnvHashMap<TempId, BlockIdx>,
    pending: Vec<Option<Block>>,
}

impl Context {
    /// A context whose program consists of the open top-level entry block.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        let mut program = Program::new(options);
        let entry = program.insert_block(Block::with_kind(BlockKind::TOP_LEVEL));

        let mut ctx = Self {
            program,
            options: options.clone(),
            block: entry,
            cf: CfContext::default(),
            empty_exec_skip: None,
            cache: DecompositionCache::new(),
            derived: FnvHashMap::default(),
            def_sites: FnvHashMap::default(),
            pending: Vec::new(),
        };

        ctx.append_logical_start(entry);

        ctx
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn current_block(&self) -> BlockIdx {
        self.block
    }

    #[must_use]
    pub fn cf(&self) -> &CfContext {
        &self.cf
    }

    #[must_use]
    pub fn cache(&self) -> &DecompositionCache {
        &self.cache
    }

    /// Closes the current block and hands out the finished program.
    #[must_use]
    pub fn finish(mut self) -> Program {
        self.end_empty_exec_skip();

        assert!(self.pending.iter().all(Option::is_none), "unclosed control flow at end of program");

        let block = self.block;
        self.append_logical_end(block);
        self.program.block_mut(block).kind |= BlockKind::UNIFORM;
        self.emit(Instruction::bare(Opcode::SEndpgm));

        self.program.end_wqm();

        self.program
    }

    pub fn tmp(&mut self, rc: RegClass) -> Temp {
        self.program.allocate_tmp(rc)
    }

    /// Appends `instr` to the current block.
    pub fn emit(&mut self, instr: Instruction) {
        self.push_to(self.block, instr);
    }

    pub(crate) fn push_to(&mut self, block: BlockIdx, instr: Instruction) {
        self.record_defs(block, &instr);
        self.program.block_mut(block).instructions.push(instr);
    }

    /// Emits `instr` right after the definition of `value` when it's known, so the result
    /// dominates every use `value` could have. Otherwise appends to the current block.
    pub(crate) fn emit_at_def(&mut self, value: Temp, instr: Instruction) {
        let Some(&block) = self.def_sites.get(&value.id()) else {
            return self.emit(instr);
        };

        let instrs = &self.program.block(block).instructions;
        let pos = match instrs.iter().rposition(|it| it.defines(value.id())) {
            Some(pos) if instrs[pos].opcode.is_phi() => body_start(instrs),
            Some(pos) => pos + 1,
            None => instrs.len(),
        };

        self.record_defs(block, &instr);
        self.program.insert_instruction(block, pos, instr);
    }

    /// Places a phi after the phis already at the top of the current block.
    pub(crate) fn emit_phi(&mut self, instr: Instruction) {
        let block = self.block;
        let pos = self.program.block(block).leading_phis();

        self.record_defs(block, &instr);
        self.program.insert_instruction(block, pos, instr);
    }

    fn record_defs(&mut self, block: BlockIdx, instr: &Instruction) {
        for def in &instr.definitions {
            self.def_sites.insert(def.temp().id(), block);
        }
    }

    pub(crate) fn new_pending(&mut self, kind: BlockKind) -> PendingBlock {
        let slot = match self.pending.iter().position(Option::is_none) {
            Some(slot) => slot,
            None => {
                self.pending.push(None);
                self.pending.len() - 1
            }
        };

        self.pending[slot] = Some(Block::with_kind(kind));

        PendingBlock(slot)
    }

    #[track_caller]
    pub(crate) fn pending_mut(&mut self, block: PendingBlock) -> &mut Block {
        match self.pending.get_mut(block.0).and_then(Option::as_mut) {
            Some(block) => block,
            None => panic!("{block} was already inserted or dropped"),
        }
    }

    /// Inserts a pending block, mirroring its predecessor edges onto the predecessors.
    #[track_caller]
    pub(crate) fn insert_pending(&mut self, block: PendingBlock) -> BlockIdx {
        let Some(pending) = self.pending.get_mut(block.0).and_then(Option::take) else {
            panic!("{block} was already inserted or dropped");
        };

        let idx = self.program.insert_block(pending);

        let logical = self.program.block(idx).logical_preds.clone();
        for pred in logical {
            self.program.block_mut(pred).logical_succs.push(idx);
        }

        let linear = self.program.block(idx).linear_preds.clone();
        for pred in linear {
            self.program.block_mut(pred).linear_succs.push(idx);
        }

        tracing::trace!(%block, %idx, "inserted pending block");

        idx
    }

    /// Throws away a pending block that will never be reached.
    pub(crate) fn drop_pending(&mut self, block: PendingBlock) {
        if let Some(slot) = self.pending.get_mut(block.0) {
            *slot = None;
        }
    }

    pub(crate) fn kind(&self, block: BlockIdx) -> BlockKind {
        self.program.block(block).kind
    }

    pub(crate) fn add_kind(&mut self, block: BlockIdx, kind: BlockKind) {
        self.program.block_mut(block).kind |= kind;
    }

    pub(crate) fn add_logical_edge(&mut self, pred: BlockIdx, succ: impl Into<Target>) {
        let succ = succ.into();

        tracing::trace!(%pred, %succ, "logical edge");

        match succ {
            Target::Placed(idx) => {
                self.program.block_mut(idx).logical_preds.push(pred);
                self.program.block_mut(pred).logical_succs.push(idx);
            }

            Target::Pending(block) => self.pending_mut(block).logical_preds.push(pred),
        }
    }

    pub(crate) fn add_linear_edge(&mut self, pred: BlockIdx, succ: impl Into<Target>) {
        let succ = succ.into();

        tracing::trace!(%pred, %succ, "linear edge");

        match succ {
            Target::Placed(idx) => {
                self.program.block_mut(idx).linear_preds.push(pred);
                self.program.block_mut(pred).linear_succs.push(idx);
            }

            Target::Pending(block) => self.pending_mut(block).linear_preds.push(pred),
        }
    }

    pub(crate) fn add_edge(&mut self, pred: BlockIdx, succ: impl Into<Target>) {
        let succ = succ.into();
        self.add_logical_edge(pred, succ);
        self.add_linear_edge(pred, succ);
    }

    pub(crate) fn append_logical_start(&mut self, block: BlockIdx) {
        self.push_to(block, Instruction::bare(Opcode::PLogicalStart));
    }

    pub(crate) fn append_logical_end(&mut self, block: BlockIdx) {
        self.push_to(block, Instruction::bare(Opcode::PLogicalEnd));
    }
}

/// Index of the first instruction after the leading phis and the logical start marker.
fn body_start(instrs: &[Instruction]) -> usize {
    let phis = instrs.iter().take_while(|it| it.opcode.is_phi()).count();

    match instrs.get(phis) {
        Some(instr) if instr.opcode == Opcode::PLogicalStart => phis + 1,
        _ => phis,
    }
}

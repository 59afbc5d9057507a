//! The divergence-aware control-flow engine.
//!
//! Every construct is built as a pair of graphs over the same blocks. The logical graph is what
//! the source program means, the linear graph is what the hardware will actually branch along.
//! For divergent constructs both arms run one after the other on the linear graph, with the
//! active lanes flipped in between by an "invert" block.

use wavesel_core::{BranchHint, Opcode, RegClass};

use crate::context::{PendingBlock, Target};
use crate::{BlockIdx, BlockKind, BranchInfo, Constant, Context, Definition, FixedReg, Instruction, Operand, Temp};

#[cfg(test)]
mod tests;

/// What is known about the active lanes possibly being none at all.
///
/// Each flag says the mask *may* have become empty because of that kind of event; none of them
/// set means it certainly isn't empty.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default, Hash)]
pub struct ExecInfo {
    pub potentially_empty_discard: bool,
    pub potentially_empty_break: bool,
    pub potentially_empty_continue: bool,
}

impl ExecInfo {
    pub fn combine(&mut self, other: Self) {
        *self = self.combined(other);
    }

    #[must_use]
    pub const fn combined(self, other: Self) -> Self {
        Self {
            potentially_empty_discard: self.potentially_empty_discard
                || other.potentially_empty_discard,
            potentially_empty_break: self.potentially_empty_break || other.potentially_empty_break,
            potentially_empty_continue: self.potentially_empty_continue
                || other.potentially_empty_continue,
        }
    }

    #[must_use]
    pub const fn empty(self) -> bool {
        self.potentially_empty_discard
            || self.potentially_empty_break
            || self.potentially_empty_continue
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct LoopInfo {
    pub header: BlockIdx,
    /// `None` outside of any loop.
    pub exit: Option<PendingBlock>,
    pub has_divergent_continue: bool,
    pub has_divergent_break: bool,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct IfInfo {
    pub is_divergent: bool,
}

/// Control-flow facts about the current position.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct CfContext {
    pub parent_loop: LoopInfo,
    pub parent_if: IfInfo,
    /// The current block already ended in a uniform jump.
    pub has_branch: bool,
    /// The current block is only reachable on the linear graph, after a divergent jump.
    pub has_divergent_branch: bool,
    pub had_divergent_discard: bool,
    pub in_divergent_cf: bool,
    pub exec: ExecInfo,
}

impl CfContext {
    #[must_use]
    pub fn in_loop(&self) -> bool {
        self.parent_loop.exit.is_some()
    }
}

/// An open `if`, created by one of the `begin_*_if_then` operations and consumed by the matching
/// `end_*_if`.
#[must_use = "an open if has to be ended"]
#[derive(Debug)]
pub struct IfScope {
    cond: Option<Temp>,
    cf_info_old: CfContext,
    if_idx: BlockIdx,
    invert: Option<PendingBlock>,
    invert_idx: Option<BlockIdx>,
    endif: PendingBlock,
    in_else: bool,
}

/// An open loop, consumed by [`Context::end_loop`].
#[must_use = "an open loop has to be ended"]
#[derive(Debug)]
pub struct LoopScope {
    exit: PendingBlock,
    cf_info_old: CfContext,
}

/// Describes what follows a point where the active lanes may have just run out.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct SkipPoint {
    /// Nothing but possibly a jump follows in the current block.
    pub rest_of_block_empty: bool,
    /// No control flow or further blocks follow in the current list.
    pub further_cf_empty: bool,
}

/// Which arm of an `if` a scope guard closure is asked to build.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Arm {
    Then,
    Else,
}

impl Arm {
    #[must_use]
    pub fn pick<T>(self, then_arm: T, else_arm: T) -> T {
        match self {
            Self::Then => then_arm,
            Self::Else => else_arm,
        }
    }
}

impl Context {
    fn emit_branch(&mut self, block: BlockIdx, opcode: Opcode, operands: Vec<Operand>, info: BranchInfo) {
        self.push_to(block, Instruction::branch(opcode, operands, info));
    }

    fn emit_jump(&mut self, block: BlockIdx) {
        self.emit_branch(block, Opcode::PBranch, Vec::new(), BranchInfo::default());
    }

    /// Drops the "possibly empty" facts that stop being true once the lanes that caused them
    /// are back.
    fn update_exec_info(&mut self) {
        let cf = &mut self.cf;

        if !cf.in_divergent_cf {
            cf.exec.potentially_empty_discard = false;
        }

        if !cf.parent_if.is_divergent && !cf.parent_loop.has_divergent_continue {
            cf.exec.potentially_empty_break = false;
        }

        if !cf.parent_if.is_divergent {
            cf.exec.potentially_empty_continue = false;
        }
    }

    /// Ends the current block and opens a loop.
    ///
    /// The current block becomes the preheader, and a fresh header block becomes current.
    #[track_caller]
    pub fn begin_loop(&mut self) -> LoopScope {
        assert!(!self.cf.exec.empty(), "never enter a loop with an empty exec mask");

        let preheader = self.block;
        self.append_logical_end(preheader);
        self.add_kind(preheader, BlockKind::LOOP_PREHEADER | BlockKind::UNIFORM);
        self.emit_jump(preheader);

        let exit_kind = BlockKind::LOOP_EXIT | (self.kind(preheader) & BlockKind::TOP_LEVEL);
        let exit = self.new_pending(exit_kind);

        self.program.next_loop_depth += 1;

        let header = self.program.create_and_insert_block();
        self.add_kind(header, BlockKind::LOOP_HEADER);
        self.add_edge(preheader, header);
        self.block = header;
        self.append_logical_start(header);

        tracing::trace!(%preheader, %header, "begin loop");

        let cf_info_old = self.cf;
        self.cf.parent_loop =
            LoopInfo { header, exit: Some(exit), has_divergent_continue: false, has_divergent_break: false };
        self.cf.parent_if.is_divergent = false;

        LoopScope { exit, cf_info_old }
    }

    /// Marks the loop being built as having a break some lanes may take without others, and
    /// everything after it as divergent.
    pub fn mark_divergent_break(&mut self) {
        assert!(self.cf.in_loop(), "divergent break outside of a loop");

        self.cf.parent_loop.has_divergent_break = true;
        self.cf.in_divergent_cf = true;
    }

    /// Closes the loop: adds the back edge if the body didn't end in a jump and continues in
    /// the exit block.
    #[track_caller]
    pub fn end_loop(&mut self, scope: LoopScope) {
        let LoopScope { exit, mut cf_info_old } = scope;

        assert!(
            !self.cf.exec.potentially_empty_discard,
            "discards can't leave the exec mask empty inside a loop"
        );

        if !self.cf.has_branch {
            let block = self.block;
            let header = self.cf.parent_loop.header;

            self.append_logical_end(block);
            self.add_kind(block, BlockKind::CONTINUE | BlockKind::UNIFORM);

            match self.cf.has_divergent_branch {
                false => self.add_edge(block, header),
                true => self.add_linear_edge(block, header),
            }

            self.emit_jump(block);
        }

        self.program.next_loop_depth -= 1;

        let exit = self.insert_pending(exit);
        self.block = exit;
        self.append_logical_start(exit);

        assert!(
            !self.program.block(exit).logical_preds.is_empty(),
            "loop exit {exit} has no logical predecessor"
        );

        tracing::trace!(%exit, "end loop");

        cf_info_old.exec.potentially_empty_discard |= self.cf.exec.potentially_empty_discard;
        cf_info_old.had_divergent_discard |= self.cf.had_divergent_discard;
        self.cf = cf_info_old;
        self.update_exec_info();
    }

    /// Leaves a loop that failed to build, restoring the enclosing state without wiring up
    /// the exit.
    pub(crate) fn abandon_loop(&mut self, scope: LoopScope) {
        self.drop_pending(scope.exit);
        self.program.next_loop_depth -= 1;
        self.cf = scope.cf_info_old;
    }

    /// Builds a loop around `body`. The loop is closed even if `body` fails.
    pub fn loop_scope<E>(&mut self, body: impl FnOnce(&mut Self) -> Result<(), E>) -> Result<(), E> {
        let scope = self.begin_loop();

        match body(self) {
            Ok(()) => {
                self.end_loop(scope);
                Ok(())
            }

            Err(err) => {
                self.abandon_loop(scope);
                Err(err)
            }
        }
    }

    pub fn emit_loop_break(&mut self) {
        self.emit_loop_jump(true);
    }

    pub fn emit_loop_continue(&mut self) {
        self.emit_loop_jump(false);
    }

    #[track_caller]
    fn emit_loop_jump(&mut self, is_break: bool) {
        let Some(exit) = self.cf.parent_loop.exit else {
            panic!("{} outside of a loop", if is_break { "break" } else { "continue" });
        };

        let idx = self.block;
        self.append_logical_end(idx);

        let target: Target = match is_break {
            true => {
                self.add_logical_edge(idx, exit);
                self.add_kind(idx, BlockKind::BREAK);

                // the exit is this block's only linear successor, so the edge can't be critical
                if !self.cf.parent_if.is_divergent && !self.cf.parent_loop.has_divergent_continue {
                    self.add_kind(idx, BlockKind::UNIFORM);
                    self.cf.has_branch = true;
                    self.emit_jump(idx);
                    self.add_linear_edge(idx, exit);
                    return;
                }

                self.cf.has_divergent_branch = true;
                self.cf.parent_loop.has_divergent_break = true;
                self.cf.exec.potentially_empty_break = true;

                exit.into()
            }

            false => {
                let header = self.cf.parent_loop.header;
                self.add_logical_edge(idx, header);
                self.add_kind(idx, BlockKind::CONTINUE);

                // likewise for the header
                if !self.cf.parent_if.is_divergent {
                    assert!(
                        !self.cf.exec.potentially_empty_continue
                            && !self.cf.exec.potentially_empty_discard,
                        "uniform continue with a possibly empty exec mask"
                    );

                    self.add_kind(idx, BlockKind::UNIFORM);
                    self.cf.has_branch = true;
                    self.emit_jump(idx);
                    self.add_linear_edge(idx, header);
                    return;
                }

                self.cf.has_divergent_branch = true;
                self.cf.parent_loop.has_divergent_continue = true;
                self.cf.exec.potentially_empty_continue = true;

                header.into()
            }
        };

        self.emit_jump(idx);

        // the lanes that jump leave through here, the others continue below
        let break_block = self.program.create_and_insert_block();
        self.add_kind(break_block, BlockKind::UNIFORM);
        self.add_linear_edge(idx, break_block);
        self.add_linear_edge(break_block, target);
        self.emit_jump(break_block);

        let continue_block = self.program.create_and_insert_block();
        self.add_linear_edge(idx, continue_block);
        self.append_logical_start(continue_block);
        self.block = continue_block;

        tracing::trace!(%idx, %break_block, %continue_block, is_break, "divergent jump");
    }

    /// Opens an `if` on a value that is the same for every lane.
    ///
    /// With `None` the condition is "no lane is active", which is how empty-exec skipping
    /// branches around code.
    #[track_caller]
    pub fn begin_uniform_if_then(&mut self, cond: Option<Temp>) -> IfScope {
        let if_idx = self.block;
        self.append_logical_end(if_idx);
        self.add_kind(if_idx, BlockKind::UNIFORM);

        let (operand, info) = match cond {
            Some(cond) => {
                assert_eq!(cond.rc(), RegClass::S1, "uniform conditions are scalar booleans");
                assert!(!self.cf.exec.empty(), "never enter an if with an empty exec mask");

                (Operand::Fixed(cond, FixedReg::Scc), BranchInfo::default())
            }

            None => (
                Operand::Exec(self.program.lane_mask),
                BranchInfo { rarely_taken: true, never_taken: false },
            ),
        };

        self.emit_branch(if_idx, Opcode::PCbranchZ, vec![operand], info);

        let endif = self.new_pending(self.kind(if_idx) & BlockKind::TOP_LEVEL);

        assert!(
            !self.cf.has_branch && !self.cf.has_divergent_branch,
            "an if can't start after a jump"
        );

        let cf_info_old = self.cf;

        if cond.is_some() {
            self.program.next_uniform_if_depth += 1;
        }

        let then_block = self.program.create_and_insert_block();
        self.add_edge(if_idx, then_block);
        self.block = then_block;
        self.append_logical_start(then_block);

        tracing::trace!(%if_idx, %then_block, "begin uniform if");

        IfScope { cond, cf_info_old, if_idx, invert: None, invert_idx: None, endif, in_else: false }
    }

    /// Closes the then-arm of a uniform if and opens the else-arm.
    ///
    /// A non-`logical_else` arm only exists on the linear graph.
    pub fn begin_uniform_if_else(&mut self, scope: &mut IfScope, logical_else: bool) {
        let then_block = self.block;

        if !self.cf.has_branch {
            self.append_logical_end(then_block);
            self.emit_jump(then_block);
            self.add_linear_edge(then_block, scope.endif);

            if !self.cf.has_divergent_branch {
                self.add_logical_edge(then_block, scope.endif);
            }

            self.add_kind(then_block, BlockKind::UNIFORM);
        }

        self.cf.has_branch = false;
        self.cf.has_divergent_branch = false;

        std::mem::swap(&mut self.cf, &mut scope.cf_info_old);
        scope.in_else = true;

        let else_block = self.program.create_and_insert_block();
        match logical_else {
            true => {
                self.add_edge(scope.if_idx, else_block);
                self.append_logical_start(else_block);
            }

            false => self.add_linear_edge(scope.if_idx, else_block),
        }

        self.block = else_block;

        tracing::trace!(%else_block, logical_else, "begin uniform else");
    }

    /// Closes a uniform if and continues in its merge block.
    #[track_caller]
    pub fn end_uniform_if(&mut self, scope: IfScope, logical_else: bool) {
        let else_block = self.block;

        if !self.cf.has_branch {
            if logical_else {
                self.append_logical_end(else_block);
            }

            self.emit_jump(else_block);
            self.add_linear_edge(else_block, scope.endif);

            if logical_else && !self.cf.has_divergent_branch {
                self.add_logical_edge(else_block, scope.endif);
            }

            self.add_kind(else_block, BlockKind::UNIFORM);
        }

        self.cf.has_branch = false;
        self.cf.has_divergent_branch = false;

        let old = scope.cf_info_old;
        self.cf.had_divergent_discard |= old.had_divergent_discard;
        self.cf.parent_loop.has_divergent_continue |= old.parent_loop.has_divergent_continue;
        self.cf.parent_loop.has_divergent_break |= old.parent_loop.has_divergent_break;
        self.cf.in_divergent_cf |= old.in_divergent_cf;
        self.cf.exec.combine(old.exec);

        if scope.cond.is_some() {
            self.program.next_uniform_if_depth -= 1;
        }

        let endif = self.insert_pending(scope.endif);
        self.block = endif;
        self.append_logical_start(endif);

        assert!(
            !self.program.block(endif).logical_preds.is_empty(),
            "merge block {endif} has no logical predecessor"
        );

        tracing::trace!(%endif, "end uniform if");
    }

    /// Builds a uniform if on `cond`. Both arms are always closed, even if one fails.
    pub fn uniform_if<E>(
        &mut self,
        cond: Temp,
        mut arm: impl FnMut(&mut Self, Arm) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut scope = self.begin_uniform_if_then(Some(cond));

        if let Err(err) = arm(self, Arm::Then) {
            self.abandon_if(scope);
            return Err(err);
        }

        self.begin_uniform_if_else(&mut scope, true);

        if let Err(err) = arm(self, Arm::Else) {
            self.abandon_if(scope);
            return Err(err);
        }

        self.end_uniform_if(scope, true);

        Ok(())
    }

    /// Opens an `if` whose condition differs between lanes.
    ///
    /// `cond` is a lane mask. Lanes where it is false are disabled for the then-arm.
    #[track_caller]
    pub fn begin_divergent_if_then(&mut self, cond: Temp, hint: BranchHint) -> IfScope {
        assert!(!self.cf.exec.empty(), "never enter an if with an empty exec mask");
        assert_eq!(cond.rc(), self.program.lane_mask, "divergent conditions are lane masks");

        let if_idx = self.block;
        self.append_logical_end(if_idx);
        self.add_kind(if_idx, BlockKind::BRANCH);

        let info = BranchInfo { rarely_taken: hint.rarely_taken(), never_taken: hint.never_taken() };
        self.emit_branch(if_idx, Opcode::PCbranchZ, vec![Operand::Temp(cond)], info);

        let invert = self.new_pending(BlockKind::INVERT);
        let endif = self.new_pending(BlockKind::MERGE | (self.kind(if_idx) & BlockKind::TOP_LEVEL));

        let cf_info_old = self.cf;
        self.cf.parent_if.is_divergent = true;
        self.cf.in_divergent_cf = true;

        self.program.next_divergent_if_logical_depth += 1;

        let then_logical = self.program.create_and_insert_block();
        self.add_edge(if_idx, then_logical);
        self.block = then_logical;
        self.append_logical_start(then_logical);

        tracing::trace!(%if_idx, %then_logical, "begin divergent if");

        IfScope {
            cond: Some(cond),
            cf_info_old,
            if_idx,
            invert: Some(invert),
            invert_idx: None,
            endif,
            in_else: false,
        }
    }

    /// Closes the then-arm of a divergent if, inserts the invert block and opens the else-arm.
    #[track_caller]
    pub fn begin_divergent_if_else(&mut self, scope: &mut IfScope, hint: BranchHint) {
        let Some(invert) = scope.invert.take() else {
            panic!("begin_divergent_if_else on a uniform if or an if that's already in its else-arm");
        };

        let then_logical = self.block;
        self.append_logical_end(then_logical);
        self.emit_jump(then_logical);
        self.add_linear_edge(then_logical, invert);

        if !self.cf.has_divergent_branch {
            self.add_logical_edge(then_logical, scope.endif);
        }

        self.add_kind(then_logical, BlockKind::UNIFORM);

        assert!(!self.cf.has_branch, "uniform jump inside a divergent if");
        self.cf.has_divergent_branch = false;
        self.program.next_divergent_if_logical_depth -= 1;

        // for the lanes that didn't take the then-arm at all
        let then_linear = self.program.create_and_insert_block();
        self.add_kind(then_linear, BlockKind::UNIFORM);
        self.add_linear_edge(scope.if_idx, then_linear);
        self.emit_jump(then_linear);
        self.add_linear_edge(then_linear, invert);

        let invert_idx = self.insert_pending(invert);
        let info = BranchInfo { rarely_taken: hint.rarely_taken(), never_taken: hint.never_taken() };
        self.emit_branch(invert_idx, Opcode::PBranch, Vec::new(), info);
        scope.invert_idx = Some(invert_idx);
        scope.in_else = true;

        std::mem::swap(&mut scope.cf_info_old.exec, &mut self.cf.exec);
        assert!(!self.cf.exec.empty(), "never enter an else with an empty exec mask");
        std::mem::swap(
            &mut scope.cf_info_old.had_divergent_discard,
            &mut self.cf.had_divergent_discard,
        );

        self.program.next_divergent_if_logical_depth += 1;

        let else_logical = self.program.create_and_insert_block();
        self.add_logical_edge(scope.if_idx, else_logical);
        self.add_linear_edge(invert_idx, else_logical);
        self.block = else_logical;
        self.append_logical_start(else_logical);

        tracing::trace!(%invert_idx, %else_logical, "begin divergent else");
    }

    /// Closes a divergent if and continues in its merge block.
    #[track_caller]
    pub fn end_divergent_if(&mut self, scope: IfScope) {
        let Some(invert_idx) = scope.invert_idx else {
            panic!("end_divergent_if before begin_divergent_if_else");
        };

        let else_logical = self.block;
        self.append_logical_end(else_logical);
        self.emit_jump(else_logical);
        self.add_linear_edge(else_logical, scope.endif);

        if !self.cf.has_divergent_branch {
            self.add_logical_edge(else_logical, scope.endif);
        }

        self.add_kind(else_logical, BlockKind::UNIFORM);
        self.program.next_divergent_if_logical_depth -= 1;

        assert!(!self.cf.has_branch, "uniform jump inside a divergent if");
        self.cf.has_divergent_branch = false;

        let else_linear = self.program.create_and_insert_block();
        self.add_kind(else_linear, BlockKind::UNIFORM);
        self.add_linear_edge(invert_idx, else_linear);
        self.emit_jump(else_linear);
        self.add_linear_edge(else_linear, scope.endif);

        let endif = self.insert_pending(scope.endif);
        self.block = endif;
        self.append_logical_start(endif);

        let old = scope.cf_info_old;
        self.cf.parent_if = old.parent_if;
        self.cf.had_divergent_discard |= old.had_divergent_discard;
        self.cf.in_divergent_cf = old.in_divergent_cf
            || self.cf.parent_loop.has_divergent_break
            || self.cf.parent_loop.has_divergent_continue;
        self.cf.exec.combine(old.exec);
        self.update_exec_info();

        assert!(
            !self.program.block(endif).logical_preds.is_empty(),
            "merge block {endif} has no logical predecessor"
        );

        tracing::trace!(%endif, "end divergent if");
    }

    /// Builds a divergent if on the lane mask `cond`. Both arms are always closed, even if one
    /// fails.
    pub fn divergent_if<E>(
        &mut self,
        cond: Temp,
        hint: BranchHint,
        mut arm: impl FnMut(&mut Self, Arm) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut scope = self.begin_divergent_if_then(cond, hint);

        if let Err(err) = arm(self, Arm::Then) {
            self.abandon_if(scope);
            return Err(err);
        }

        self.begin_divergent_if_else(&mut scope, hint);

        if let Err(err) = arm(self, Arm::Else) {
            self.abandon_if(scope);
            return Err(err);
        }

        self.end_divergent_if(scope);

        Ok(())
    }

    /// Leaves an if that failed to build, restoring the enclosing state without wiring up the
    /// merge.
    pub(crate) fn abandon_if(&mut self, scope: IfScope) {
        if let Some(invert) = scope.invert {
            self.drop_pending(invert);
        }

        self.drop_pending(scope.endif);

        let divergent = scope.invert.is_some() || scope.invert_idx.is_some();
        match divergent {
            true => self.program.next_divergent_if_logical_depth -= 1,
            false if scope.cond.is_some() => self.program.next_uniform_if_depth -= 1,
            false => {}
        }

        // a uniform else-arm already runs on the state from before the if
        if divergent || !scope.in_else {
            self.cf = scope.cf_info_old;
        }

        self.cf.has_branch = false;
        self.cf.has_divergent_branch = false;
    }

    /// Starts branching around the rest of the current list if the active lanes may have run
    /// out at this point.
    ///
    /// Values defined inside the skipped region stop dominating their uses, so this flags the
    /// program for SSA repair.
    #[track_caller]
    pub fn begin_empty_exec_skip(&mut self, point: SkipPoint) {
        if !self.cf.exec.empty() {
            return;
        }

        assert!(
            !self.kind(self.block).contains(BlockKind::TOP_LEVEL),
            "exec can't be empty at top level"
        );

        if point.rest_of_block_empty && point.further_cf_empty {
            return;
        }

        self.end_empty_exec_skip();

        let scope = self.begin_uniform_if_then(None);
        self.empty_exec_skip = Some(scope);
        self.cf.exec = ExecInfo::default();
        self.program.should_repair_ssa = true;

        tracing::debug!(block = %self.block, "skipping code while exec may be empty");
    }

    /// Closes the skip opened by [`Self::begin_empty_exec_skip`], if there is one.
    pub fn end_empty_exec_skip(&mut self) {
        if let Some(mut scope) = self.empty_exec_skip.take() {
            self.begin_uniform_if_else(&mut scope, false);
            self.end_uniform_if(scope, false);
        }
    }

    /// Emits a discard of the lanes where `cond` (a lane mask) is set, or of every lane.
    ///
    /// `divergent_cond` says whether `cond` can differ between lanes. `after` describes the
    /// code that follows, for deciding whether it needs skipping.
    #[track_caller]
    pub fn emit_terminate(&mut self, cond: Option<Temp>, divergent_cond: bool, after: SkipPoint) {
        assert!(!self.cf.in_loop(), "discards can't appear inside loops");

        let operand = self.discard_condition(cond);

        if cond.is_some() && divergent_cond {
            self.cf.had_divergent_discard = true;
        }

        self.emit(Instruction::new(Opcode::PDiscardIf, [], [operand]));
        self.add_kind(self.block, BlockKind::USES_DISCARD);

        if self.cf.in_divergent_cf {
            self.cf.exec.potentially_empty_discard = true;
            self.cf.had_divergent_discard = true;
            self.begin_empty_exec_skip(after);
        }

        self.program.needs_exact = true;
    }

    /// Turns the lanes where `cond` is set (or every lane) into helpers.
    pub fn emit_demote(&mut self, cond: Option<Temp>) {
        let operand = self.discard_condition(cond);

        self.emit(Instruction::new(Opcode::PDemoteToHelper, [], [operand]));

        if self.cf.in_divergent_cf {
            self.request_wqm(crate::wqm::WqmRequest::WqmWithHelpers);
        }

        self.add_kind(self.block, BlockKind::USES_DISCARD);
        self.program.needs_exact = true;
    }

    /// The lanes a discard applies to: inside divergent flow the condition has to be limited to
    /// the active lanes.
    fn discard_condition(&mut self, cond: Option<Temp>) -> Operand {
        let Some(cond) = cond else {
            return Operand::Const(Constant::c32(u32::MAX));
        };

        assert_eq!(cond.rc(), self.program.lane_mask, "discard conditions are lane masks");

        if !self.cf.in_divergent_cf {
            return Operand::Temp(cond);
        }

        let lane_mask = self.program.lane_mask;
        let active = self.tmp(lane_mask);
        let scc = self.tmp(RegClass::S1);
        let and = match lane_mask == RegClass::S2 {
            true => Opcode::SAndB64,
            false => Opcode::SAndB32,
        };

        self.emit(Instruction::new(
            and,
            [Definition::new(active), Definition::fixed(scc, FixedReg::Scc)],
            [Operand::Temp(cond), Operand::Exec(lane_mask)],
        ));

        Operand::Temp(active)
    }
}

//! The driver: walks the structured IR and lowers it through the control-flow engine.

use smallvec::SmallVec;
use wavesel_core::{DWORD_BYTES, MAX_COMPONENTS, Opcode, RegClass, RegType};
use wavesel_ir::{AluOp, Axis, CfNode, Def, DefId, IfNode, Instr, LoopNode, Op, Shader};

use crate::lowering::{DefaultLowering, Lowering, LoweringTable, RuleKey, lane_mask_op};
use crate::wqm::{FragmentWqmPolicy, WqmPolicy};
use crate::{
    BlockIdx, Constant, Context, Definition, FixedReg, Instruction, IselError, Operand, Options,
    Program, SkipPoint, Temp,
};


/// Selects `shader` with the built in lowering table and whole-quad policy.
pub fn select_program(shader: &Shader, options: &Options) -> Result<Program, IselError> {
    select_program_with(shader, options, &DefaultLowering, &FragmentWqmPolicy)
}

pub fn select_program_with(
    shader: &Shader,
    options: &Options,
    lowering: &dyn LoweringTable,
    wqm: &dyn WqmPolicy,
) -> Result<Program, IselError> {
    let options = options.for_shader(shader);
    options.check()?;

    let depth = shader.max_depth();
    if depth > options.max_cf_depth {
        return Err(IselError::NestingTooDeep { depth, limit: options.max_cf_depth });
    }

    check_structure(&shader.body, false)?;

    let _span = tracing::debug_span!(
        "select_program",
        stage = %options.stage,
        gfx = %options.gfx_level,
        lanes = options.wave_size.lanes(),
    )
    .entered();

    let mut ctx = Context::new(&options);
    let mut selector = Selector::new(shader, &options, lowering, wqm, &mut ctx);

    selector.visit_cf_list(&mut ctx, &shader.body, 0)?;

    let phis = std::mem::take(&mut selector.phis);
    let program = ctx.finish();

    for phi in phis {
        let preds = program.block(phi.block).logical_preds.len();
        if preds != phi.sources {
            return Err(IselError::malformed(
                phi.instr,
                format!(
                    "phi has {} source(s) but its block has {preds} logical predecessor(s)",
                    phi.sources
                ),
            ));
        }
    }

    tracing::info!(
        blocks = program.blocks.len(),
        temps = program.temp_count(),
        needs_wqm = program.needs_wqm,
        needs_exact = program.needs_exact,
        should_repair_ssa = program.should_repair_ssa,
        "selected program"
    );

    Ok(program)
}

/// Rejects the shapes the engine relies on never seeing.
fn check_structure(nodes: &[CfNode], in_loop: bool) -> Result<(), IselError> {
    for (node_idx, node) in nodes.iter().enumerate() {
        match node {
            CfNode::Block(instrs) => {
                let mut seen_non_phi = false;

                for (idx, instr) in instrs.iter().enumerate() {
                    match &instr.op {
                        Op::Phi(_) if seen_non_phi => {
                            return Err(IselError::malformed(instr, "phis have to come first in a block"));
                        }

                        Op::Phi(_) => {}

                        Op::Break | Op::Continue if !in_loop => {
                            return Err(IselError::malformed(instr, "jump outside of a loop"));
                        }

                        Op::Break | Op::Continue
                            if idx + 1 != instrs.len() || node_idx + 1 != nodes.len() =>
                        {
                            return Err(IselError::malformed(instr, "unreachable code after a jump"));
                        }

                        Op::Terminate | Op::TerminateIf(_) if in_loop => {
                            return Err(IselError::malformed(instr, "discard inside a loop"));
                        }

                        _ => {}
                    }

                    seen_non_phi |= !matches!(instr.op, Op::Phi(_));
                }
            }

            CfNode::If(node) => {
                check_structure(&node.then_body, in_loop)?;
                check_structure(&node.else_body, in_loop)?;

                if ends_with_jump(&node.then_body) && ends_with_jump(&node.else_body) {
                    return Err(IselError::malformed_at(
                        node.loc,
                        "both arms of an if end in a jump, so nothing follows it",
                    ));
                }
            }

            CfNode::Loop(node) => {
                check_structure(&node.body, true)?;

                if !contains_break(&node.body) {
                    return Err(IselError::malformed_at(node.loc, "loop never breaks"));
                }
            }
        }
    }

    Ok(())
}

fn last_instr(nodes: &[CfNode]) -> Option<&Instr> {
    match nodes.last()? {
        CfNode::Block(instrs) => instrs.last(),
        CfNode::If(_) | CfNode::Loop(_) => None,
    }
}

fn ends_with_jump(nodes: &[CfNode]) -> bool {
    last_instr(nodes).is_some_and(|it| it.op.is_jump())
}

/// Whether `nodes` break out of the innermost loop around them.
fn contains_break(nodes: &[CfNode]) -> bool {
    nodes.iter().any(|node| match node {
        CfNode::Block(instrs) => instrs.iter().any(|it| it.op == Op::Break),
        CfNode::If(it) => contains_break(&it.then_body) || contains_break(&it.else_body),
        CfNode::Loop(_) => false,
    })
}

/// A loop whose body always ends by breaking never reaches its header a second time.
fn loops_back(node: &LoopNode) -> bool {
    last_instr(&node.body).is_none_or(|it| it.op != Op::Break)
}

/// A phi whose operand count can only be checked once its block is complete.
struct PendingPhi<'a> {
    instr: &'a Instr,
    block: BlockIdx,
    sources: usize,
}

struct Selector<'a> {
    shader: &'a Shader,
    options: &'a Options,
    lowering: &'a dyn LoweringTable,
    wqm: &'a dyn WqmPolicy,
    /// The value each definition lowers to, indexed by [`DefId`].
    temps: Vec<Option<Temp>>,
    phis: Vec<PendingPhi<'a>>,
}

impl<'a> Selector<'a> {
    fn new(
        shader: &'a Shader,
        options: &'a Options,
        lowering: &'a dyn LoweringTable,
        wqm: &'a dyn WqmPolicy,
        ctx: &mut Context,
    ) -> Self {
        let lane_mask = ctx.program.lane_mask;

        let temps = shader
            .defs
            .iter()
            .map(|def| def.map(|def| ctx.tmp(reg_class(&def, lane_mask))))
            .collect();

        Self { shader, options, lowering, wqm, temps, phis: Vec::new() }
    }

    fn temp(&self, def: DefId) -> Result<Temp, IselError> {
        self.temps.get(def.index()).copied().flatten().ok_or(IselError::UndefinedValue { def })
    }

    fn def(&self, def: DefId) -> Result<&'a Def, IselError> {
        self.shader.def(def).ok_or(IselError::UndefinedValue { def })
    }

    fn dst(&self, instr: &Instr) -> Result<(Def, Temp), IselError> {
        let def = instr.def.ok_or_else(|| IselError::malformed(instr, "missing definition"))?;

        Ok((def, self.temp(def.id)?))
    }

    fn visit_cf_list(
        &mut self,
        ctx: &mut Context,
        nodes: &'a [CfNode],
        depth: usize,
    ) -> Result<(), IselError> {
        if let [node] = nodes {
            if node.is_empty_block() {
                return Ok(());
            }
        }

        let saved_skip = ctx.empty_exec_skip.take();

        let res = self.visit_nodes(ctx, nodes, depth);
        match res {
            Ok(()) => ctx.end_empty_exec_skip(),
            Err(_) => {
                if let Some(scope) = ctx.empty_exec_skip.take() {
                    ctx.abandon_if(scope);
                }
            }
        }

        ctx.empty_exec_skip = saved_skip;

        res
    }

    fn visit_nodes(
        &mut self,
        ctx: &mut Context,
        nodes: &'a [CfNode],
        depth: usize,
    ) -> Result<(), IselError> {
        for (idx, node) in nodes.iter().enumerate() {
            let further_cf_empty = idx + 1 == nodes.len();

            match node {
                CfNode::Block(instrs) => self.visit_block(ctx, instrs, further_cf_empty, depth)?,
                CfNode::If(it) => {
                    if idx == 0 || !matches!(nodes[idx - 1], CfNode::Block(_)) {
                        self.visit_block(ctx, &[], false, depth)?;
                    }

                    self.visit_if(ctx, it, depth)?;
                }

                CfNode::Loop(it) => {
                    if idx == 0 || !matches!(nodes[idx - 1], CfNode::Block(_)) {
                        self.visit_block(ctx, &[], false, depth)?;
                    }

                    self.visit_loop(ctx, it, depth)?;
                }
            }
        }

        Ok(())
    }

    fn visit_block(
        &mut self,
        ctx: &mut Context,
        instrs: &'a [Instr],
        further_cf_empty: bool,
        depth: usize,
    ) -> Result<(), IselError> {
        let _span = tracing::debug_span!("block", depth, len = instrs.len()).entered();

        let phis = instrs.iter().take_while(|it| matches!(it.op, Op::Phi(_))).count();
        let (phis, rest) = instrs.split_at(phis);

        for phi in phis {
            self.visit_phi(ctx, phi)?;
        }

        let empty_from = |idx: usize| rest.get(idx).is_none_or(|it| it.op.is_jump());

        ctx.begin_empty_exec_skip(SkipPoint { rest_of_block_empty: empty_from(0), further_cf_empty });

        for (idx, instr) in rest.iter().enumerate() {
            let after = SkipPoint { rest_of_block_empty: empty_from(idx + 1), further_cf_empty };
            self.visit_instr(ctx, instr, after)?;
        }

        Ok(())
    }

    fn visit_if(&mut self, ctx: &mut Context, node: &'a IfNode, depth: usize) -> Result<(), IselError> {
        let _span = tracing::debug_span!("if", depth, divergent = node.divergent).entered();

        if !self.def(node.cond)?.is_bool() {
            return Err(IselError::malformed_at(node.loc, "if condition isn't a boolean"));
        }

        let cond = self.temp(node.cond)?;
        let (then_body, else_body) = (&node.then_body, &node.else_body);

        match node.divergent {
            false => {
                let cond = ctx.bool_to_scalar_condition(cond);
                ctx.uniform_if(cond, |ctx, arm| {
                    self.visit_cf_list(ctx, arm.pick(then_body, else_body), depth + 1)
                })
            }

            true => ctx.divergent_if(cond, node.hint, |ctx, arm| {
                self.visit_cf_list(ctx, arm.pick(then_body, else_body), depth + 1)
            }),
        }
    }

    fn visit_loop(&mut self, ctx: &mut Context, node: &'a LoopNode, depth: usize) -> Result<(), IselError> {
        let _span = tracing::debug_span!("loop", depth, divergent_break = node.divergent_break).entered();

        ctx.loop_scope(|ctx| {
            if node.divergent_break && loops_back(node) {
                ctx.mark_divergent_break();
            }

            self.visit_cf_list(ctx, &node.body, depth + 1)
        })
    }

    fn visit_phi(&mut self, ctx: &mut Context, instr: &'a Instr) -> Result<(), IselError> {
        let Op::Phi(srcs) = &instr.op else { unreachable!() };

        let (def, dst) = self.dst(instr)?;
        let operands: SmallVec<[Operand; 4]> =
            srcs.iter().map(|&src| self.temp(src).map(Operand::Temp)).collect::<Result<_, _>>()?;

        let opcode = match def.is_bool() {
            true => Opcode::PBooleanPhi,
            false => Opcode::PPhi,
        };

        ctx.emit_phi(Instruction::new(opcode, [Definition::new(dst)], operands));

        self.phis.push(PendingPhi { instr, block: ctx.current_block(), sources: srcs.len() });

        Ok(())
    }

    fn visit_instr(&mut self, ctx: &mut Context, instr: &'a Instr, after: SkipPoint) -> Result<(), IselError> {
        tracing::trace!(%instr, "lowering");

        match &instr.op {
            Op::Const(values) => self.visit_const(ctx, instr, values)?,
            Op::Undef => self.visit_undef(ctx, instr)?,
            Op::Alu { op, srcs } => self.visit_alu(ctx, instr, *op, srcs)?,
            Op::Vec(srcs) => self.visit_vec(ctx, instr, srcs)?,
            Op::Extract { src, index } => self.visit_extract(ctx, instr, *src, *index)?,
            Op::Convert { src, signed } => self.visit_convert(ctx, instr, *src, *signed)?,
            Op::LoadBuffer { offset, channels, zero_fill } => {
                self.visit_load_buffer(ctx, instr, *offset, *channels, *zero_fill)?;
            }

            Op::Tex { coords, .. } => self.visit_tex(ctx, instr, coords)?,
            Op::Derivative { src, axis } => self.visit_derivative(ctx, instr, *src, *axis)?,
            Op::ReadFirstLane(src) => self.visit_read_first_lane(ctx, instr, *src)?,
            Op::Phi(_) => unreachable!("phis are visited before the rest of their block"),

            Op::Terminate => ctx.emit_terminate(None, false, after),
            Op::TerminateIf(cond) => {
                let (divergent, cond) = self.condition(instr, *cond)?;
                ctx.emit_terminate(Some(cond), divergent, after);
            }

            Op::Demote => ctx.emit_demote(None),
            Op::DemoteIf(cond) => {
                let (_, cond) = self.condition(instr, *cond)?;
                ctx.emit_demote(Some(cond));
            }

            Op::Break => {
                ctx.end_empty_exec_skip();
                ctx.emit_loop_break();
            }

            Op::Continue => {
                ctx.end_empty_exec_skip();
                ctx.emit_loop_continue();
            }
        }

        if let Some(request) = self.wqm.request(instr, ctx.cf(), self.options.stage) {
            ctx.request_wqm(request);
        }

        Ok(())
    }

    fn condition(&self, instr: &Instr, cond: DefId) -> Result<(bool, Temp), IselError> {
        let def = self.def(cond)?;
        if !def.is_bool() {
            return Err(IselError::malformed(instr, "condition isn't a boolean"));
        }

        Ok((def.divergent, self.temp(cond)?))
    }

    fn visit_const(&mut self, ctx: &mut Context, instr: &Instr, values: &[u64]) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;

        if values.len() != usize::from(def.num_components) {
            return Err(IselError::malformed(instr, "one literal per component is required"));
        }

        if def.is_bool() {
            let lane_mask = ctx.program.lane_mask;
            let value = match values[0] != 0 {
                true => u64::MAX,
                false => 0,
            };

            ctx.copy(dst, Constant::new(lane_mask.bytes(), value));
            return Ok(());
        }

        let component_bytes = def.bit_size / 8;

        // scalar registers pack narrow components into whole dwords
        if dst.ty() == RegType::Sgpr && component_bytes < DWORD_BYTES {
            let mut bytes: Vec<u8> = values
                .iter()
                .flat_map(|value| value.to_le_bytes().into_iter().take(usize::from(component_bytes)))
                .collect();
            bytes.resize(usize::from(dst.bytes()), 0);

            let dwords: SmallVec<[Operand; 4]> = bytes
                .chunks(usize::from(DWORD_BYTES))
                .map(|chunk| {
                    let value = chunk.iter().rev().fold(0, |acc, &byte| (acc << 8) | u64::from(byte));
                    Operand::Const(Constant::new(DWORD_BYTES, value))
                })
                .collect();

            emit_constant_vector(ctx, dst, dwords);
            return Ok(());
        }

        let components = values.iter().map(|&value| Operand::Const(Constant::new(component_bytes, value)));
        emit_constant_vector(ctx, dst, components.collect());

        Ok(())
    }

    fn visit_undef(&mut self, ctx: &mut Context, instr: &Instr) -> Result<(), IselError> {
        let (_, dst) = self.dst(instr)?;

        let mut pieces = SmallVec::new();
        let mut left = dst.bytes();
        while left > 0 {
            let piece = left.min(DWORD_BYTES);
            pieces.push(Operand::Const(Constant::zero(piece)));
            left -= piece;
        }

        emit_constant_vector(ctx, dst, pieces);

        Ok(())
    }

    fn visit_alu(
        &mut self,
        ctx: &mut Context,
        instr: &Instr,
        op: AluOp,
        srcs: &[DefId],
    ) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;

        if srcs.len() != op.arity() {
            return Err(IselError::malformed(instr, format!("`{op}` takes {} source(s)", op.arity())));
        }

        let src_defs = srcs.iter().map(|&src| self.def(src)).collect::<Result<SmallVec<[_; 2]>, _>>()?;
        let temps = srcs.iter().map(|&src| self.temp(src)).collect::<Result<SmallVec<[_; 2]>, _>>()?;

        let bits = src_defs[0].bit_size;
        if src_defs.iter().any(|it| it.bit_size != bits || it.num_components != def.num_components) {
            return Err(IselError::malformed(instr, "sources have different types"));
        }

        match op.is_comparison() {
            true if !def.is_bool() => {
                return Err(IselError::malformed(instr, "comparisons define a boolean"));
            }

            false if def.bit_size != bits => {
                return Err(IselError::malformed(instr, "sources and result have different types"));
            }

            _ => {}
        }

        if def.num_components != 1 {
            return Err(IselError::unsupported(instr, "vector ALU operations"));
        }

        if op == AluOp::Mov {
            match (temps[0].ty(), dst.ty()) {
                (RegType::Vgpr, RegType::Sgpr) => ctx.as_uniform(dst, temps[0]),
                _ => ctx.copy(dst, temps[0]),
            }

            return Ok(());
        }

        if bits == 1 {
            let Some(opcode) = lane_mask_op(op, ctx.program.lane_mask) else {
                return Err(IselError::unsupported(instr, format!("boolean `{op}`")));
            };

            let scc = ctx.tmp(RegClass::S1);
            ctx.emit(Instruction::new(
                opcode,
                [Definition::new(dst), Definition::fixed(scc, FixedReg::Scc)],
                temps.iter().map(|&it| Operand::Temp(it)),
            ));

            return Ok(());
        }

        let ty = match op.is_comparison() {
            true if def.divergent => RegType::Vgpr,
            true => RegType::Sgpr,
            false => dst.ty(),
        };

        let key = RuleKey { op, bits, ty, gfx: self.options.gfx_level };
        if let Some(lowering) = self.lowering.lookup(&key) {
            emit_alu(ctx, lowering, ty, dst, &temps, op.is_comparison());
            return Ok(());
        }

        // a uniform result can always be computed per lane and read back
        if ty == RegType::Sgpr {
            if let Some(lowering) = self.lowering.lookup(&RuleKey { ty: RegType::Vgpr, ..key }) {
                // per-lane comparisons already produce the lane mask
                let per_lane = match op.is_comparison() {
                    true => dst,
                    false => ctx.tmp(RegClass::get(RegType::Vgpr, bits / 8)),
                };

                emit_alu(ctx, lowering, RegType::Vgpr, per_lane, &temps, op.is_comparison());

                if per_lane != dst {
                    ctx.as_uniform(dst, per_lane);
                }

                return Ok(());
            }
        }

        let file = match ty {
            RegType::Sgpr => "scalar",
            RegType::Vgpr => "per-lane",
        };

        Err(IselError::unsupported(
            instr,
            format!("no {bits}-bit `{op}` for {file} registers on {}", self.options.gfx_level),
        ))
    }

    fn visit_vec(&mut self, ctx: &mut Context, instr: &Instr, srcs: &[DefId]) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;

        if srcs.len() != usize::from(def.num_components) {
            return Err(IselError::malformed(instr, "one source per component is required"));
        }

        for &src in srcs {
            let src = self.def(src)?;
            if src.num_components != 1 || src.bit_size != def.bit_size {
                return Err(IselError::malformed(instr, "sources have to be single components of the result type"));
            }
        }

        if def.is_bool() {
            return Err(IselError::unsupported(instr, "boolean vectors"));
        }

        let component_bytes = def.bit_size / 8;
        let temps = srcs.iter().map(|&src| self.temp(src)).collect::<Result<SmallVec<[_; 4]>, _>>()?;

        if dst.ty() == RegType::Sgpr && component_bytes >= DWORD_BYTES {
            let parts: SmallVec<[Temp; 4]> = temps
                .iter()
                .map(|&part| match part.ty() {
                    RegType::Sgpr => part,
                    RegType::Vgpr => {
                        let uniform = ctx.tmp(part.rc().with_ty(RegType::Sgpr));
                        ctx.as_uniform(uniform, part);
                        uniform
                    }
                })
                .collect();

            ctx.create_vector_into(dst, &parts);
            return Ok(());
        }

        // narrow components can only be packed per lane
        let per_lane_rc = RegClass::get(RegType::Vgpr, component_bytes);
        let parts: SmallVec<[Temp; 4]> = temps
            .iter()
            .map(|&part| match component_bytes < DWORD_BYTES {
                true => ctx.extract_component(part, 0, per_lane_rc),
                false => part,
            })
            .collect();

        match dst.ty() {
            RegType::Vgpr => ctx.create_vector_into(dst, &parts),
            RegType::Sgpr => {
                let bytes = component_bytes * def.num_components;
                let per_lane = ctx.create_vector(&parts, RegClass::get(RegType::Vgpr, bytes));
                ctx.as_uniform(dst, per_lane);
            }
        }

        Ok(())
    }

    fn visit_extract(
        &mut self,
        ctx: &mut Context,
        instr: &Instr,
        src: DefId,
        index: u8,
    ) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;
        let src_def = self.def(src)?;

        if index >= src_def.num_components {
            return Err(IselError::malformed(instr, format!("{src} has no component {index}")));
        }

        if src_def.bit_size != def.bit_size || def.num_components != 1 {
            return Err(IselError::malformed(instr, "result has to be one component of the source"));
        }

        if def.is_bool() {
            return Err(IselError::unsupported(instr, "boolean vectors"));
        }

        let src = self.temp(src)?;
        let component_bytes = def.bit_size / 8;
        let idx = usize::from(index);

        let part = match (src.ty(), dst.ty()) {
            (_, RegType::Sgpr) if component_bytes < DWORD_BYTES || src.ty() == RegType::Vgpr => {
                let part = ctx.extract_component(src, idx, RegClass::get(RegType::Vgpr, component_bytes));
                ctx.as_uniform(dst, part);

                return Ok(());
            }

            _ => ctx.extract_component(src, idx, dst.rc()),
        };

        ctx.copy(dst, part);

        Ok(())
    }

    fn visit_convert(
        &mut self,
        ctx: &mut Context,
        instr: &Instr,
        src: DefId,
        signed: bool,
    ) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;
        let src_def = self.def(src)?;

        if src_def.num_components != 1 || def.num_components != 1 {
            return Err(IselError::unsupported(instr, "vector conversions"));
        }

        if src_def.is_bool() || def.is_bool() {
            return Err(IselError::unsupported(instr, "boolean conversions"));
        }

        if signed && def.bit_size < src_def.bit_size {
            return Err(IselError::malformed(instr, "signed conversions can't shrink"));
        }

        let src = self.temp(src)?;
        let (src_bits, dst_bits) = (src_def.bit_size, def.bit_size);

        match (src.ty(), dst.ty()) {
            (RegType::Vgpr, RegType::Sgpr) => {
                let per_lane = ctx.convert_width(src, src_bits, dst_bits, signed);
                ctx.as_uniform(dst, per_lane);
            }

            (RegType::Sgpr, RegType::Vgpr) => {
                let uniform = ctx.convert_width(src, src_bits, dst_bits, signed);
                let per_lane = ctx.extract_component(uniform, 0, dst.rc());
                ctx.copy(dst, per_lane);
            }

            _ => {
                ctx.convert_width_into(src, src_bits, dst_bits, signed, Some(dst));
            }
        }

        Ok(())
    }

    fn visit_load_buffer(
        &mut self,
        ctx: &mut Context,
        instr: &Instr,
        offset: DefId,
        channels: u8,
        zero_fill: bool,
    ) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;

        if def.bit_size != 32 || def.num_components > 4 {
            return Err(IselError::unsupported(instr, "only up to four 32-bit components can be loaded"));
        }

        let n = usize::from(def.num_components);
        if channels == 0 || u32::from(channels) >> n != 0 {
            return Err(IselError::malformed(instr, format!("channel mask {channels:#x} doesn't fit {n} component(s)")));
        }

        let offset = self.temp(offset)?;
        let count = channels.count_ones() as u8;
        let opcode = Opcode::buffer_load(count)
            .ok_or_else(|| IselError::unsupported(instr, format!("loading {count} dwords")))?;

        let fetched = ctx.tmp(RegClass::new(RegType::Vgpr, count));
        ctx.emit(Instruction::new(opcode, [Definition::new(fetched)], [Operand::Temp(offset)]));
        ctx.expand(fetched, dst, n, u32::from(channels), zero_fill);

        Ok(())
    }

    fn visit_tex(&mut self, ctx: &mut Context, instr: &Instr, coords: &[DefId]) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;

        if def.bit_size != 32 || coords.is_empty() || coords.len() > 4 {
            return Err(IselError::unsupported(instr, "texture sampling needs 1 to 4 32-bit coordinates"));
        }

        let mut parts: SmallVec<[Temp; 4]> = SmallVec::new();
        for &coord in coords {
            let coord_def = self.def(coord)?;
            if coord_def.bit_size != 32 || coord_def.num_components != 1 {
                return Err(IselError::unsupported(instr, "coordinates have to be 32-bit scalars"));
            }

            let coord = self.temp(coord)?;
            parts.push(ctx.as_vgpr(coord));
        }

        let address = match parts.as_slice() {
            [single] => *single,
            _ => ctx.create_vector(&parts, RegClass::new(RegType::Vgpr, parts.len() as u8)),
        };

        let per_lane = match dst.ty() {
            RegType::Vgpr => dst,
            RegType::Sgpr => ctx.tmp(dst.rc().with_ty(RegType::Vgpr)),
        };

        ctx.emit(Instruction::new(Opcode::ImageSample, [Definition::new(per_lane)], [Operand::Temp(address)]));

        if per_lane != dst {
            ctx.as_uniform(dst, per_lane);
        }

        Ok(())
    }

    fn visit_derivative(
        &mut self,
        ctx: &mut Context,
        instr: &Instr,
        src: DefId,
        axis: Axis,
    ) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;

        if def.bit_size != 32 || def.num_components != 1 {
            return Err(IselError::unsupported(instr, "only 32-bit scalar derivatives"));
        }

        let src = self.temp(src)?;
        let src = ctx.as_vgpr(src);

        // every lane of a quad reads the top left lane, then its right or bottom neighbour
        let top_left = ctx.tmp(RegClass::V1);
        ctx.emit(
            Instruction::new(Opcode::VMovB32, [Definition::new(top_left)], [Operand::Temp(src)])
                .with_quad_perm([0; 4]),
        );

        let neighbour = match axis {
            Axis::X => 1,
            Axis::Y => 2,
        };

        let per_lane = match dst.ty() {
            RegType::Vgpr => dst,
            RegType::Sgpr => ctx.tmp(RegClass::V1),
        };

        ctx.emit(
            Instruction::new(
                Opcode::VSubF32,
                [Definition::new(per_lane)],
                [Operand::Temp(src), Operand::Temp(top_left)],
            )
            .with_quad_perm([neighbour; 4]),
        );

        if per_lane != dst {
            ctx.as_uniform(dst, per_lane);
        }

        Ok(())
    }

    fn visit_read_first_lane(
        &mut self,
        ctx: &mut Context,
        instr: &Instr,
        src: DefId,
    ) -> Result<(), IselError> {
        let (def, dst) = self.dst(instr)?;

        if def.is_bool() {
            return Err(IselError::unsupported(instr, "reading the first lane of a boolean"));
        }

        let src = self.temp(src)?;

        let uniform = match src.ty() {
            RegType::Sgpr => src,
            RegType::Vgpr => {
                let uniform = match dst.ty() {
                    RegType::Sgpr => dst,
                    RegType::Vgpr => ctx.tmp(src.rc().with_ty(RegType::Sgpr)),
                };

                match src.size() {
                    1 => ctx.emit(Instruction::new(
                        Opcode::VReadfirstlaneB32,
                        [Definition::new(uniform)],
                        [Operand::Temp(src)],
                    )),

                    _ => ctx.as_uniform(uniform, src),
                }

                uniform
            }
        };

        if uniform == dst {
            return Ok(());
        }

        match dst.ty() {
            RegType::Sgpr => ctx.copy(dst, uniform),
            RegType::Vgpr => {
                let part = ctx.extract_component(uniform, 0, dst.rc());
                ctx.copy(dst, part);
            }
        }

        Ok(())
    }
}

/// The class a definition is selected into.
fn reg_class(def: &Def, lane_mask: RegClass) -> RegClass {
    if def.is_bool() {
        return lane_mask;
    }

    let ty = match def.divergent {
        true => RegType::Vgpr,
        false => RegType::Sgpr,
    };

    RegClass::get(ty, def.bytes())
}

/// Defines `dst` from constant pieces that exactly cover it.
fn emit_constant_vector(ctx: &mut Context, dst: Temp, pieces: SmallVec<[Operand; 4]>) {
    debug_assert!(pieces.len() <= MAX_COMPONENTS * 2);

    match pieces.as_slice() {
        [single] => ctx.copy(dst, *single),
        _ => ctx.emit(Instruction::new(Opcode::PCreateVector, [Definition::new(dst)], pieces)),
    }
}

fn emit_alu(ctx: &mut Context, lowering: Lowering, ty: RegType, dst: Temp, srcs: &[Temp], compare: bool) {
    let mut operands: SmallVec<[Operand; 2]> = srcs
        .iter()
        .map(|&src| match (ty, src.ty()) {
            (RegType::Sgpr, RegType::Vgpr) => {
                let uniform = ctx.tmp(src.rc().with_ty(RegType::Sgpr));
                ctx.as_uniform(uniform, src);
                Operand::Temp(uniform)
            }

            _ => Operand::Temp(src),
        })
        .collect();

    if lowering.reversed {
        operands.reverse();
    }

    // scalar compares only set scc, which then has to be spread into a lane mask
    if compare && ty == RegType::Sgpr {
        let scc = ctx.tmp(RegClass::S1);
        ctx.emit(Instruction::new(lowering.opcode, [Definition::fixed(scc, FixedReg::Scc)], operands));
        ctx.bool_to_vector_condition_into(scc, dst);

        return;
    }

    let mut definitions: SmallVec<[Definition; 2]> = SmallVec::new();
    definitions.push(Definition::new(dst));

    if lowering.writes_scc {
        let scc = ctx.tmp(RegClass::S1);
        definitions.push(Definition::fixed(scc, FixedReg::Scc));
    }

    ctx.emit(Instruction::new(lowering.opcode, definitions, operands));
}

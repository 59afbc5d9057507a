//! Selects randomly generated structured programs and checks the graph properties on each.

use fnv::FnvHashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wavesel_core::{BranchHint, Stage, WaveSize};
use wavesel_ir::{AluOp, CfNode, Def, DefId, IfNode, Instr, LoopNode, Op, Shader};

use crate::validate::assert_well_formed;
use crate::{BlockKind, Options, select_program};

const MAX_DEPTH: usize = 4;

const HINTS: [BranchHint; 4] =
    [BranchHint::None, BranchHint::Flatten, BranchHint::AlwaysTaken, BranchHint::NeverTaken];

struct Generator {
    rng: StdRng,
    shader: Shader,
    /// 32-bit values defined at top level, usable anywhere after their definition.
    values: Vec<Def>,
    conds: Vec<Def>,
    divergent_ifs: usize,
    loops: usize,
    discards: usize,
}

impl Generator {
    fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let shader = Shader {
            stage: Some(match rng.random_bool(0.5) {
                true => Stage::Fragment,
                false => Stage::Compute,
            }),
            wave: Some(match rng.random_bool(0.5) {
                true => WaveSize::W32,
                false => WaveSize::W64,
            }),
            ..Shader::default()
        };

        Self { rng, shader, values: Vec::new(), conds: Vec::new(), divergent_ifs: 0, loops: 0, discards: 0 }
    }

    fn def(&mut self, bit_size: u8, num_components: u8, divergent: bool) -> Def {
        let def = Def::new(DefId(self.shader.defs.len() as u32), bit_size, num_components, divergent);
        self.shader.declare(def);
        def
    }

    fn value(&mut self) -> DefId {
        self.values[self.rng.random_range(0..self.values.len())].id
    }

    fn cond(&mut self) -> Def {
        self.conds[self.rng.random_range(0..self.conds.len())]
    }

    fn generate(mut self) -> Self {
        let uniform = self.def(32, 1, false);
        let divergent = self.def(32, 1, true);
        let always = self.def(1, 1, false);
        let lane_cond = self.def(1, 1, true);

        let prologue = vec![
            Instr::new(Some(uniform), Op::Const(vec![7])),
            Instr::new(Some(divergent), Op::Const(vec![9])),
            Instr::new(Some(always), Op::Const(vec![1])),
            Instr::new(Some(lane_cond), Op::Alu { op: AluOp::Ult, srcs: vec![divergent.id, uniform.id] }),
        ];

        self.values.extend([uniform, divergent]);
        self.conds.extend([always, lane_cond]);

        let mut body = vec![CfNode::Block(prologue)];
        self.list(&mut body, 0, false);
        self.shader.body = body;

        self
    }

    fn fragment(&self) -> bool {
        self.shader.stage == Some(Stage::Fragment)
    }

    /// Appends up to three nodes to `nodes`.
    fn list(&mut self, nodes: &mut Vec<CfNode>, depth: usize, in_loop: bool) {
        for _ in 0..self.rng.random_range(1..=3) {
            let node = match self.rng.random_range(0..4) {
                0 | 1 if depth < MAX_DEPTH => self.if_node(depth, in_loop),
                2 if depth < MAX_DEPTH => self.loop_node(depth),
                _ => CfNode::Block(self.block(depth, in_loop)),
            };

            match (nodes.last_mut(), node) {
                (Some(CfNode::Block(prev)), CfNode::Block(instrs)) => prev.extend(instrs),
                (_, node) => nodes.push(node),
            }
        }
    }

    fn block(&mut self, depth: usize, in_loop: bool) -> Vec<Instr> {
        let mut instrs = Vec::new();

        for _ in 0..self.rng.random_range(0..4) {
            let divergent = self.rng.random_bool(0.5);

            let instr = match self.rng.random_range(0..7) {
                0 => {
                    let def = self.def(32, 1, divergent);
                    Instr::new(Some(def), Op::Const(vec![self.rng.random::<u32>().into()]))
                }

                1 => {
                    let srcs = vec![self.value(), self.value()];
                    let def = self.def(32, 1, divergent);
                    Instr::new(Some(def), Op::Alu { op: AluOp::Add, srcs })
                }

                2 => {
                    let srcs = vec![self.value(), self.value()];
                    let def = self.def(1, 1, divergent);
                    Instr::new(Some(def), Op::Alu { op: AluOp::Ult, srcs })
                }

                3 => {
                    let srcs = vec![self.value(), self.value()];
                    let vec = self.def(32, 2, divergent);
                    instrs.push(Instr::new(Some(vec), Op::Vec(srcs)));

                    let divergent = self.rng.random_bool(0.5);
                    let def = self.def(32, 1, divergent);
                    let index = self.rng.random_range(0..2);
                    Instr::new(Some(def), Op::Extract { src: vec.id, index })
                }

                4 => {
                    let src = self.value();
                    let signed = self.rng.random_bool(0.5);
                    let def = self.def(64, 1, divergent);
                    Instr::new(Some(def), Op::Convert { src, signed })
                }

                5 if self.fragment() && !in_loop => {
                    self.discards += 1;
                    match self.rng.random_bool(0.5) {
                        true => Instr::new(None, Op::Terminate),
                        false => Instr::new(None, Op::TerminateIf(self.cond().id)),
                    }
                }

                6 if self.fragment() => {
                    self.discards += 1;
                    match self.rng.random_bool(0.5) {
                        true => Instr::new(None, Op::Demote),
                        false => Instr::new(None, Op::DemoteIf(self.cond().id)),
                    }
                }

                _ => continue,
            };

            // only top-level values dominate everything that follows
            if depth == 0 {
                match instr.def {
                    Some(def) if def.bit_size == 32 && def.num_components == 1 => self.values.push(def),
                    Some(def) if def.is_bool() => self.conds.push(def),
                    _ => {}
                }
            }

            instrs.push(instr);
        }

        instrs
    }

    fn if_node(&mut self, depth: usize, in_loop: bool) -> CfNode {
        let cond = self.cond();
        let hint = HINTS[self.rng.random_range(0..HINTS.len())];

        let mut then_body = Vec::new();
        self.list(&mut then_body, depth + 1, in_loop);

        if in_loop && self.rng.random_bool(0.3) {
            let jump = match self.rng.random_bool(0.5) {
                true => Op::Break,
                false => Op::Continue,
            };

            match then_body.last_mut() {
                Some(CfNode::Block(instrs)) => instrs.push(Instr::new(None, jump)),
                _ => then_body.push(CfNode::Block(vec![Instr::new(None, jump)])),
            }
        }

        let mut else_body = Vec::new();
        if self.rng.random_bool(0.5) {
            self.list(&mut else_body, depth + 1, in_loop);
        }

        self.divergent_ifs += usize::from(cond.divergent);

        CfNode::If(IfNode { cond: cond.id, divergent: cond.divergent, hint, then_body, else_body, loc: None })
    }

    fn loop_node(&mut self, depth: usize) -> CfNode {
        self.loops += 1;

        let mut body = Vec::new();
        self.list(&mut body, depth + 1, true);

        // every loop leaves through a final conditional break
        let cond = self.cond();
        self.divergent_ifs += usize::from(cond.divergent);
        body.push(CfNode::If(IfNode {
            cond: cond.id,
            divergent: cond.divergent,
            hint: BranchHint::None,
            then_body: vec![CfNode::Block(vec![Instr::new(None, Op::Break)])],
            else_body: Vec::new(),
            loc: None,
        }));

        let divergent_break = cond.divergent || self.rng.random_bool(0.2);
        CfNode::Loop(LoopNode { divergent_break, body, loc: None })
    }
}

#[test]
fn random_programs() {
    crate::tests::init_tracing();

    let mut discards = 0;
    for seed in 0..500 {
        let generated = Generator::new(seed).generate();
        discards += generated.discards;
        let shader = &generated.shader;

        let program = match select_program(shader, &Options::default()) {
            Ok(program) => program,
            Err(e) => panic!("seed {seed}: {e}\n{}", shader.display()),
        };

        assert_well_formed(&program);

        assert_eq!(program.next_loop_depth, 0, "seed {seed}");
        assert_eq!(program.next_divergent_if_logical_depth, 0, "seed {seed}");
        assert_eq!(program.next_uniform_if_depth, 0, "seed {seed}");

        let count = |kind: BlockKind| program.blocks.iter().filter(|it| it.kind.contains(kind)).count();
        assert_eq!(count(BlockKind::LOOP_HEADER), generated.loops, "seed {seed}");
        assert_eq!(count(BlockKind::INVERT), generated.divergent_ifs, "seed {seed}");

        let mut defined = FnvHashSet::default();
        for block in &program.blocks {
            let last = block.instructions.last().map(|it| it.opcode);
            assert!(
                last.is_some_and(|it| it.is_branch() || it == wavesel_core::Opcode::SEndpgm),
                "seed {seed}: {} doesn't end in a branch",
                block.index
            );

            for def in block.instructions.iter().flat_map(|it| &it.definitions) {
                assert!(defined.insert(def.temp().id()), "seed {seed}: {} is defined twice", def.temp());
            }
        }

        if let Some(wave) = shader.wave {
            assert_eq!(program.lane_mask, wave.lane_mask(), "seed {seed}");
        }
    }

    assert!(discards > 0, "no program discarded anything");
}

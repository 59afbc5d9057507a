//! The structured, SSA-based shader IR handed to instruction selection.
//!
//! Control flow is a tree: plain instruction blocks, `if`s and `loop`s. Every definition carries a
//! divergence flag computed by an earlier analysis.

#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation, clippy::match_bool)]
#![warn(clippy::must_use_candidate)]

use std::fmt;

use wavesel_core::{BranchHint, GfxLevel, Stage, WaveSize};

mod display;
mod op;

pub use display::ShaderDisplay;
pub use op::{AluOp, Axis, Op};

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct DefId(pub u32);

impl DefId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// An SSA definition: its id, shape and whether lanes may disagree on its value.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct Def {
    pub id: DefId,
    pub bit_size: u8,
    pub num_components: u8,
    pub divergent: bool,
}

impl Def {
    #[must_use]
    pub const fn new(id: DefId, bit_size: u8, num_components: u8, divergent: bool) -> Self {
        assert!(num_components > 0);
        Self { id, bit_size, num_components, divergent }
    }

    /// One-bit values are booleans.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        self.bit_size == 1
    }

    /// Size of the whole value in bytes (booleans excluded).
    #[must_use]
    pub const fn bytes(&self) -> u8 {
        self.bit_size / 8 * self.num_components
    }
}

impl fmt::Display for Def {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let file = if self.divergent { 'v' } else { 'u' };
        write!(f, "{}:{file}{}", self.id, self.bit_size)?;

        if self.num_components > 1 {
            write!(f, "x{}", self.num_components)?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default)]
pub struct SourceLoc {
    pub line: u32,
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}", self.line)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instr {
    pub def: Option<Def>,
    pub op: Op,
    pub loc: Option<SourceLoc>,
}

impl Instr {
    #[must_use]
    pub fn new(def: Option<Def>, op: Op) -> Self {
        Self { def, op, loc: None }
    }

    #[must_use]
    pub fn with_loc(mut self, loc: SourceLoc) -> Self {
        self.loc = Some(loc);
        self
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(def) = &self.def {
            write!(f, "{def} = ")?;
        }

        self.op.fmt(f)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IfNode {
    pub cond: DefId,
    pub divergent: bool,
    pub hint: BranchHint,
    pub then_body: Vec<CfNode>,
    pub else_body: Vec<CfNode>,
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LoopNode {
    /// Hint from divergence analysis: some break out of this loop may be taken by only part of the wave.
    pub divergent_break: bool,
    pub body: Vec<CfNode>,
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CfNode {
    Block(Vec<Instr>),
    If(IfNode),
    Loop(LoopNode),
}

impl CfNode {
    /// Block nodes without any instructions don't need to be visited at all.
    #[must_use]
    pub fn is_empty_block(&self) -> bool {
        matches!(self, Self::Block(instrs) if instrs.is_empty())
    }
}

/// A whole shader function.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Shader {
    pub stage: Option<Stage>,
    pub gfx: Option<GfxLevel>,
    pub wave: Option<WaveSize>,
    /// Indexed by [`DefId`].
    pub defs: Vec<Option<Def>>,
    pub body: Vec<CfNode>,
}

impl Shader {
    #[must_use]
    pub fn def(&self, id: DefId) -> Option<&Def> {
        self.defs.get(id.index()).and_then(Option::as_ref)
    }

    /// Registers `def`, returning the previous definition with the same id if there was one.
    pub fn declare(&mut self, def: Def) -> Option<Def> {
        let idx = def.id.index();
        if self.defs.len() <= idx {
            self.defs.resize(idx + 1, None);
        }

        self.defs[idx].replace(def)
    }

    /// Total nesting depth of `if`s and `loop`s.
    ///
    /// Walks with an explicit stack, so arbitrarily deep inputs can be measured safely.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self.body.as_slice(), 0)];

        while let Some((nodes, depth)) = stack.pop() {
            max = max.max(depth);

            for node in nodes {
                match node {
                    CfNode::Block(_) => {}
                    CfNode::If(it) => {
                        stack.push((&it.then_body, depth + 1));
                        stack.push((&it.else_body, depth + 1));
                    }
                    CfNode::Loop(it) => stack.push((&it.body, depth + 1)),
                }
            }
        }

        max
    }

    #[must_use]
    pub fn display(&self) -> ShaderDisplay<'_> {
        ShaderDisplay(self)
    }
}

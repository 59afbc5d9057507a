use std::fmt;
use std::str::FromStr;

use crate::DefId;

macro_rules! alu_ops {
    ($($variant:ident => $name:literal),* $(,)?) => {
        #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
        pub enum AluOp {
            $($variant,)*
        }

        impl AluOp {
            pub const ALL: &[Self] = &[$(Self::$variant,)*];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }

        impl FromStr for AluOp {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, ()> {
                match s {
                    $($name => Ok(Self::$variant),)*
                    _ => Err(()),
                }
            }
        }
    };
}

alu_ops! {
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    And => "and",
    Or => "or",
    Xor => "xor",
    Shl => "shl",
    Shr => "shr",
    Ishr => "ishr",
    Eq => "eq",
    Ult => "ult",
    Fadd => "fadd",
    Fmul => "fmul",
    Mov => "mov",
}

impl AluOp {
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Mov => 1,
            _ => 2,
        }
    }

    /// Comparisons produce a boolean regardless of their operand size.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ult)
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Fadd | Self::Fmul)
    }
}

impl fmt::Display for AluOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Op {
    /// One literal per component.
    Const(Vec<u64>),
    Undef,
    Alu { op: AluOp, srcs: Vec<DefId> },
    Vec(Vec<DefId>),
    Extract { src: DefId, index: u8 },
    /// Width conversion to the size of the defining value.
    Convert { src: DefId, signed: bool },
    /// `channels` is a mask of the components actually read.
    LoadBuffer { offset: DefId, channels: u8, zero_fill: bool },
    Tex { coords: Vec<DefId>, implicit_derivatives: bool },
    Derivative { src: DefId, axis: Axis },
    ReadFirstLane(DefId),
    /// Sources are ordered like the predecessors of the enclosing merge or loop header.
    Phi(Vec<DefId>),
    Terminate,
    TerminateIf(DefId),
    Demote,
    DemoteIf(DefId),
    Break,
    Continue,
}

impl Op {
    #[must_use]
    pub const fn is_jump(&self) -> bool {
        matches!(self, Self::Break | Self::Continue)
    }

    #[must_use]
    pub const fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate | Self::TerminateIf(_))
    }

    #[must_use]
    pub const fn is_demote(&self) -> bool {
        matches!(self, Self::Demote | Self::DemoteIf(_))
    }

    /// Whether the op has to define a value.
    #[must_use]
    pub const fn has_def(&self) -> bool {
        !matches!(
            self,
            Self::Terminate
                | Self::TerminateIf(_)
                | Self::Demote
                | Self::DemoteIf(_)
                | Self::Break
                | Self::Continue
        )
    }

    pub fn visit_srcs(&self, mut f: impl FnMut(DefId)) {
        match self {
            Self::Const(_)
            | Self::Undef
            | Self::Terminate
            | Self::Demote
            | Self::Break
            | Self::Continue => {}

            Self::Alu { srcs, .. } | Self::Vec(srcs) | Self::Phi(srcs) => {
                srcs.iter().copied().for_each(f);
            }

            Self::Tex { coords, .. } => coords.iter().copied().for_each(f),

            Self::Extract { src, .. }
            | Self::Convert { src, .. }
            | Self::Derivative { src, .. }
            | Self::ReadFirstLane(src)
            | Self::TerminateIf(src)
            | Self::DemoteIf(src) => f(*src),

            Self::LoadBuffer { offset, .. } => f(*offset),
        }
    }

    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Const(_) => "const",
            Self::Undef => "undef",
            Self::Alu { op, .. } => op.as_str(),
            Self::Vec(_) => "vec",
            Self::Extract { .. } => "extract",
            Self::Convert { signed: false, .. } => "convert",
            Self::Convert { signed: true, .. } => "convert.signed",
            Self::LoadBuffer { .. } => "load_buffer",
            Self::Tex { .. } => "tex",
            Self::Derivative { axis: Axis::X, .. } => "ddx",
            Self::Derivative { axis: Axis::Y, .. } => "ddy",
            Self::ReadFirstLane(_) => "read_first_lane",
            Self::Phi(_) => "phi",
            Self::Terminate => "terminate",
            Self::TerminateIf(_) => "terminate_if",
            Self::Demote => "demote",
            Self::DemoteIf(_) => "demote_if",
            Self::Break => "break",
            Self::Continue => "continue",
        }
    }
}

fn list(f: &mut fmt::Formatter, ids: &[DefId]) -> fmt::Result {
    for (idx, id) in ids.iter().enumerate() {
        if idx != 0 {
            f.write_str(",")?;
        }

        write!(f, " {id}")?;
    }

    Ok(())
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())?;

        match self {
            Self::Const(values) => {
                for (idx, value) in values.iter().enumerate() {
                    let sep = if idx == 0 { "" } else { "," };
                    write!(f, "{sep} {value:#x}")?;
                }

                Ok(())
            }

            Self::Undef | Self::Terminate | Self::Demote | Self::Break | Self::Continue => Ok(()),

            Self::Alu { srcs, .. } | Self::Vec(srcs) | Self::Phi(srcs) => list(f, srcs),

            Self::Extract { src, index } => write!(f, " {src}, {index}"),

            Self::Convert { src, .. }
            | Self::Derivative { src, .. }
            | Self::ReadFirstLane(src)
            | Self::TerminateIf(src)
            | Self::DemoteIf(src) => write!(f, " {src}"),

            Self::LoadBuffer { offset, channels, zero_fill } => {
                write!(f, " {offset}, {channels:#x}")?;
                if *zero_fill {
                    f.write_str(", zero")?;
                }

                Ok(())
            }

            Self::Tex { coords, implicit_derivatives } => {
                list(f, coords)?;
                if *implicit_derivatives {
                    f.write_str(", implicit")?;
                }

                Ok(())
            }
        }
    }
}

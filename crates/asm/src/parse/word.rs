use std::str::FromStr;

use wavesel_ir::{AluOp, Axis};

#[non_exhaustive]
pub(crate) struct ParseWordError;

pub(crate) enum Word {
    Const,
    Undef,
    Alu(AluOp),
    Vec,
    Extract,
    Convert { signed: bool },
    LoadBuffer,
    Tex,
    Derivative(Axis),
    ReadFirstLane,
    Phi,
    Terminate,
    TerminateIf,
    Demote,
    DemoteIf,
    Break,
    Continue,
}

impl FromStr for Word {
    type Err = ParseWordError;

    fn from_str(str: &str) -> Result<Self, Self::Err> {
        if let Ok(op) = str.parse::<AluOp>() {
            return Ok(Self::Alu(op));
        }

        let res = match str {
            "const" => Self::Const,
            "undef" => Self::Undef,
            "vec" => Self::Vec,
            "extract" => Self::Extract,
            "convert" => Self::Convert { signed: false },
            "convert.signed" => Self::Convert { signed: true },
            "load_buffer" => Self::LoadBuffer,
            "tex" => Self::Tex,
            "ddx" => Self::Derivative(Axis::X),
            "ddy" => Self::Derivative(Axis::Y),
            "read_first_lane" => Self::ReadFirstLane,
            "phi" => Self::Phi,
            "terminate" => Self::Terminate,
            "terminate_if" => Self::TerminateIf,
            "demote" => Self::Demote,
            "demote_if" => Self::DemoteIf,
            "break" => Self::Break,
            "continue" => Self::Continue,
            _ => return Err(ParseWordError),
        };

        Ok(res)
    }
}

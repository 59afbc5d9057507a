//! Instruction selection: lowers the structured shader IR into a graph of blocks holding machine
//! pseudo-instructions, keeping a logical graph (for dataflow) and a linear graph (for the actual
//! branches) in sync while tracking lane divergence.

#![forbid(unsafe_code)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::match_bool
)]
#![warn(clippy::must_use_candidate, clippy::clone_on_copy)]

mod block;
mod cache;
mod cf;
mod context;
mod error;
pub mod eval;
mod id;
mod instruction;
pub mod lowering;
mod options;
mod program;
mod select;
mod temp;
pub mod validate;
mod value;
pub mod wqm;

#[cfg(test)]
mod tests;

pub use block::{Block, BlockDisplay, BlockIdx, BlockKind};
pub use cache::DecompositionCache;
pub use cf::{Arm, CfContext, ExecInfo, IfInfo, IfScope, LoopInfo, LoopScope, SkipPoint};
pub use context::{Context, PendingBlock};
pub use error::IselError;
pub use id::{IdAllocator, TempId};
pub use instruction::{BranchInfo, Instruction};
pub use options::Options;
pub use program::{Program, ProgramDisplay, WqmPoint};
pub use select::{select_program, select_program_with};
pub use temp::{Constant, Definition, FixedReg, Operand, Temp};

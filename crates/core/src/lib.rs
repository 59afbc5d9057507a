#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation, clippy::match_bool)]
#![warn(clippy::must_use_candidate)]

mod gfx;
mod hint;
pub mod opcode;
mod reg_class;

pub use gfx::{GfxLevel, Stage, WaveSize};
pub use hint::BranchHint;
pub use opcode::Opcode;
pub use reg_class::{RegClass, RegType};

/// Bytes in one native register word.
pub const DWORD_BYTES: u8 = 4;

/// Upper bound on the number of components a single composite value may be split into.
pub const MAX_COMPONENTS: usize = 16;

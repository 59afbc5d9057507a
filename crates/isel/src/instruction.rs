use std::fmt;

use smallvec::SmallVec;
use wavesel_core::Opcode;

use crate::{Definition, Operand, TempId};

/// Static prediction flags carried by branches.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct BranchInfo {
    pub rarely_taken: bool,
    pub never_taken: bool,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: SmallVec<[Operand; 4]>,
    pub definitions: SmallVec<[Definition; 2]>,
    pub branch: BranchInfo,
    /// Lane swizzle inside each quad, for the data-parallel-primitive encodings.
    pub quad_perm: Option<[u8; 4]>,
}

impl Instruction {
    #[must_use]
    pub fn new(
        opcode: Opcode,
        definitions: impl IntoIterator<Item = Definition>,
        operands: impl IntoIterator<Item = Operand>,
    ) -> Self {
        Self {
            opcode,
            operands: operands.into_iter().collect(),
            definitions: definitions.into_iter().collect(),
            branch: BranchInfo::default(),
            quad_perm: None,
        }
    }

    /// An instruction with neither operands nor definitions.
    #[must_use]
    pub fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, [], [])
    }

    #[must_use]
    pub fn branch(opcode: Opcode, operands: impl IntoIterator<Item = Operand>, info: BranchInfo) -> Self {
        assert!(opcode.is_branch(), "`{opcode}` is not a branch");

        Self { branch: info, ..Self::new(opcode, [], operands) }
    }

    #[must_use]
    pub fn with_quad_perm(mut self, perm: [u8; 4]) -> Self {
        self.quad_perm = Some(perm);
        self
    }

    #[must_use]
    pub fn defines(&self, id: TempId) -> bool {
        self.definitions.iter().any(|def| def.temp().id() == id)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, def) in self.definitions.iter().enumerate() {
            if idx != 0 {
                f.write_str(", ")?;
            }

            def.fmt(f)?;
        }

        if !self.definitions.is_empty() {
            f.write_str(" = ")?;
        }

        self.opcode.fmt(f)?;

        for (idx, op) in self.operands.iter().enumerate() {
            match idx {
                0 => write!(f, " {op}")?,
                _ => write!(f, ", {op}")?,
            }
        }

        if self.branch.rarely_taken {
            f.write_str(" rarely_taken")?;
        }

        if self.branch.never_taken {
            f.write_str(" never_taken")?;
        }

        if let Some([a, b, c, d]) = self.quad_perm {
            write!(f, " quad_perm:[{a},{b},{c},{d}]")?;
        }

        Ok(())
    }
}

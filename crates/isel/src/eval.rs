//! Interprets the data movement instructions for a single lane, so value transformations can
//! be checked on actual bytes.

use std::fmt;

use fnv::FnvHashMap;
use wavesel_core::Opcode;

use crate::{Definition, FixedReg, Instruction, Operand, Temp, TempId};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum EvalError {
    Unsupported(Opcode),
    UnknownValue(TempId),
    /// An instruction's operands don't fit its definitions.
    SizeMismatch(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unsupported(opcode) => write!(f, "can't evaluate `{opcode}`"),
            Self::UnknownValue(id) => write!(f, "{id} has no value"),
            Self::SizeMismatch(instr) => write!(f, "sizes don't line up in `{instr}`"),
        }
    }
}

impl std::error::Error for EvalError {}

/// The values one lane sees.
#[derive(Debug, Default, Clone)]
pub struct Lane {
    values: FnvHashMap<TempId, Vec<u8>>,
}

impl Lane {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub fn set(&mut self, temp: Temp, bytes: &[u8]) {
        assert_eq!(bytes.len(), usize::from(temp.bytes()), "{temp} is {} bytes", temp.bytes());

        self.values.insert(temp.id(), bytes.to_vec());
    }

    #[must_use]
    pub fn get(&self, temp: Temp) -> Option<&[u8]> {
        self.values.get(&temp.id()).map(Vec::as_slice)
    }

    /// Runs `instrs` in order. Logical region markers are ignored.
    pub fn run<'a>(&mut self, instrs: impl IntoIterator<Item = &'a Instruction>) -> Result<(), EvalError> {
        instrs.into_iter().try_for_each(|instr| self.step(instr))
    }

    pub fn step(&mut self, instr: &Instruction) -> Result<(), EvalError> {
        let mismatch = || EvalError::SizeMismatch(instr.to_string());

        match instr.opcode {
            Opcode::PLogicalStart | Opcode::PLogicalEnd => {}

            // scalar garbage above the copied bytes is fine, so sizes only have to fit
            Opcode::PParallelcopy | Opcode::PAsUniform => {
                if instr.operands.len() != instr.definitions.len() {
                    return Err(mismatch());
                }

                for (def, op) in instr.definitions.iter().zip(&instr.operands) {
                    let value = self.operand(op)?;
                    self.define(*def, value);
                }
            }

            Opcode::PSplitVector => {
                let [src] = instr.operands.as_slice() else { return Err(mismatch()) };
                let value = self.operand(src)?;

                let total: usize = instr.definitions.iter().map(|def| usize::from(def.temp().bytes())).sum();
                if total != value.len() {
                    return Err(mismatch());
                }

                let mut rest = value.as_slice();
                for def in &instr.definitions {
                    let (part, tail) = rest.split_at(usize::from(def.temp().bytes()));
                    self.define(*def, part.to_vec());
                    rest = tail;
                }
            }

            Opcode::PCreateVector => {
                let [def] = instr.definitions.as_slice() else { return Err(mismatch()) };

                let mut value = Vec::new();
                for op in &instr.operands {
                    value.extend(self.operand(op)?);
                }

                if value.len() != usize::from(def.temp().bytes()) {
                    return Err(mismatch());
                }

                self.define(*def, value);
            }

            Opcode::PExtractVector => {
                let ([def], [src, Operand::Const(idx)]) =
                    (instr.definitions.as_slice(), instr.operands.as_slice())
                else {
                    return Err(mismatch());
                };

                let value = self.operand(src)?;
                let size = usize::from(def.temp().bytes());
                let start = idx.value() as usize * size;

                let part = value.get(start..start + size).ok_or_else(mismatch)?;
                self.define(*def, part.to_vec());
            }

            Opcode::PExtract => {
                let (Some(def), [src, Operand::Const(idx), Operand::Const(bits), Operand::Const(sign)]) =
                    (instr.definitions.first(), instr.operands.as_slice())
                else {
                    return Err(mismatch());
                };

                let bits = bits.value() as u32;
                if bits == 0 || bits >= 64 {
                    return Err(mismatch());
                }

                let value = to_u64(&self.operand(src)?);
                let field = (value >> (idx.value() as u32 * bits)) & ((1 << bits) - 1);

                let extended = match sign.value() != 0 && field >> (bits - 1) != 0 {
                    true => field | (u64::MAX << bits),
                    false => field,
                };

                let value = from_u64(extended, def.temp().bytes());
                self.define(*def, value);
                self.define_scc(instr, extended != 0);
            }

            Opcode::SAshrI32 | Opcode::VAshrrevI32 => {
                let (src, shift) = match (instr.opcode, instr.operands.as_slice()) {
                    (Opcode::SAshrI32, [src, shift]) | (Opcode::VAshrrevI32, [shift, src]) => (src, shift),
                    _ => return Err(mismatch()),
                };

                let Some(def) = instr.definitions.first() else { return Err(mismatch()) };

                let value = to_u64(&self.operand(src)?) as u32 as i32;
                let shift = to_u64(&self.operand(shift)?) as u32 & 31;
                let result = value >> shift;

                self.define(*def, from_u64(u64::from(result as u32), 4));
                self.define_scc(instr, result != 0);
            }

            opcode => return Err(EvalError::Unsupported(opcode)),
        }

        Ok(())
    }

    fn operand(&self, op: &Operand) -> Result<Vec<u8>, EvalError> {
        match op {
            Operand::Temp(temp) | Operand::Fixed(temp, _) => self
                .values
                .get(&temp.id())
                .cloned()
                .ok_or(EvalError::UnknownValue(temp.id())),

            Operand::Const(constant) => Ok(from_u64(constant.value(), constant.bytes())),

            // any value will do, so pick zero
            Operand::Undef(rc) => Ok(vec![0; usize::from(rc.bytes())]),

            Operand::Exec(_) => Err(EvalError::Unsupported(Opcode::PParallelcopy)),
        }
    }

    /// Stores `value` resized to the definition.
    fn define(&mut self, def: Definition, mut value: Vec<u8>) {
        value.resize(usize::from(def.temp().bytes()), 0);
        self.values.insert(def.temp().id(), value);
    }

    fn define_scc(&mut self, instr: &Instruction, set: bool) {
        for def in &instr.definitions {
            if def.fixed_reg() == Some(FixedReg::Scc) {
                self.values.insert(def.temp().id(), vec![u8::from(set), 0, 0, 0]);
            }
        }
    }
}

fn to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().take(8).rev().fold(0, |acc, &byte| (acc << 8) | u64::from(byte))
}

fn from_u64(value: u64, bytes: u8) -> Vec<u8> {
    let mut out = value.to_le_bytes().to_vec();
    out.resize(usize::from(bytes), 0);
    out
}

#[cfg(test)]
mod tests;

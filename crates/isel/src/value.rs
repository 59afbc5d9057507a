//! Composite values: splitting them into components, building them from components and
//! changing integer widths, all while reusing earlier decompositions.

use smallvec::SmallVec;
use wavesel_core::{MAX_COMPONENTS, Opcode, RegClass, RegType};

use crate::{Constant, Context, Definition, FixedReg, Instruction, Operand, Temp};

#[cfg(test)]
mod tests;

impl Context {
    /// Emits a plain copy of `src` into `dst`.
    pub fn copy(&mut self, dst: Temp, src: impl Into<Operand>) {
        let src: Operand = src.into();
        self.emit(Instruction::new(Opcode::PParallelcopy, [Definition::new(dst)], [src]));
    }

    /// Makes a per-lane value uniform. Every active lane has to hold the same value already.
    pub fn as_uniform(&mut self, dst: Temp, src: Temp) {
        assert_eq!(dst.ty(), RegType::Sgpr, "as_uniform defines a scalar value");

        self.emit(Instruction::new(Opcode::PAsUniform, [Definition::new(dst)], [Operand::Temp(src)]));
    }

    /// `value` in the per-lane file, copying it over if it's scalar.
    pub fn as_vgpr(&mut self, value: Temp) -> Temp {
        if value.ty() == RegType::Vgpr {
            return value;
        }

        let dst = self.tmp(RegClass::new(RegType::Vgpr, value.size()));
        self.copy(dst, value);

        dst
    }

    /// Turns a scalar boolean held in `scc` into a lane mask with every lane set or none.
    pub fn bool_to_vector_condition(&mut self, value: Temp) -> Temp {
        let dst = self.tmp(self.program.lane_mask);
        self.bool_to_vector_condition_into(value, dst);

        dst
    }

    pub(crate) fn bool_to_vector_condition_into(&mut self, value: Temp, dst: Temp) {
        assert_eq!(value.rc(), RegClass::S1, "scalar booleans live in one dword");
        assert_eq!(dst.rc(), self.program.lane_mask);

        let opcode = match dst.rc() == RegClass::S2 {
            true => Opcode::SCselectB64,
            false => Opcode::SCselectB32,
        };

        self.emit(Instruction::new(
            opcode,
            [Definition::new(dst)],
            [
                Operand::Const(Constant::c32(u32::MAX)),
                Operand::Const(Constant::zero(4)),
                Operand::Fixed(value, FixedReg::Scc),
            ],
        ));
    }

    /// Turns a lane mask into a scalar boolean in `scc` that's true if any active lane is set.
    pub fn bool_to_scalar_condition(&mut self, value: Temp) -> Temp {
        let lane_mask = self.program.lane_mask;
        assert_eq!(value.rc(), lane_mask, "vector booleans are lane masks");

        let opcode = match lane_mask == RegClass::S2 {
            true => Opcode::SAndB64,
            false => Opcode::SAndB32,
        };

        let masked = self.tmp(lane_mask);
        let dst = self.tmp(RegClass::S1);
        self.emit(Instruction::new(
            opcode,
            [Definition::new(masked), Definition::fixed(dst, FixedReg::Scc)],
            [Operand::Temp(value), Operand::Exec(lane_mask)],
        ));

        dst
    }

    /// Component `idx` of `src`, taken as values of class `want`.
    ///
    /// The first extraction splits `src` completely and caches the parts, so asking for the same
    /// component again yields the same value.
    #[track_caller]
    pub fn extract_component(&mut self, src: Temp, idx: usize, want: RegClass) -> Temp {
        if src.rc() == want {
            assert_eq!(idx, 0, "{src} has a single {want} component");
            return src;
        }

        assert!(
            (idx + 1) * usize::from(want.bytes()) <= usize::from(src.bytes()),
            "component {idx} of class {want} is out of range for {src}:{}",
            src.rc()
        );

        if let Some(part) = self.cached_component(src, idx, want) {
            return part;
        }

        // scalar registers can't be split below a dword
        let src = match want.is_subdword() && src.ty() == RegType::Sgpr {
            true => self.derive(src, 0, src.rc().with_ty(RegType::Vgpr)),
            false => src,
        };

        if src.bytes() == want.bytes() {
            assert_eq!(idx, 0);
            return self.derive(src, 0, want);
        }

        if src.bytes() % want.bytes() == 0 {
            self.split_into(src, usize::from(src.bytes() / want.bytes()));

            if let Some(part) = self.cached_component(src, idx, want) {
                return part;
            }
        }

        self.derive(src, idx as u8, want)
    }

    fn cached_component(&mut self, src: Temp, idx: usize, want: RegClass) -> Option<Temp> {
        let part = *self.cache.get(src)?.get(idx)?;

        if part.bytes() != want.bytes() {
            return None;
        }

        if part.rc() == want {
            return Some(part);
        }

        assert!(
            !want.is_subdword() && want.ty() == RegType::Vgpr && part.ty() == RegType::Sgpr,
            "can't turn cached {}:{} into {want}",
            part,
            part.rc()
        );

        Some(self.derive(part, 0, want))
    }

    /// A copy (`idx` 0, same size) or single-component extract of `src`, made once right after
    /// `src` is defined.
    fn derive(&mut self, src: Temp, idx: u8, rc: RegClass) -> Temp {
        if let Some(&dst) = self.derived.get(&(src.id(), idx, rc)) {
            return dst;
        }

        let dst = self.tmp(rc);
        let instr = match (idx, src.bytes() == rc.bytes()) {
            (0, true) if rc.ty() == RegType::Sgpr && src.ty() == RegType::Vgpr => {
                Instruction::new(Opcode::PAsUniform, [Definition::new(dst)], [Operand::Temp(src)])
            }

            (0, true) => {
                Instruction::new(Opcode::PParallelcopy, [Definition::new(dst)], [Operand::Temp(src)])
            }

            _ => Instruction::new(
                Opcode::PExtractVector,
                [Definition::new(dst)],
                [Operand::Temp(src), Operand::Const(Constant::c32(u32::from(idx)))],
            ),
        };

        self.emit_at_def(src, instr);
        self.derived.insert((src.id(), idx, rc), dst);

        dst
    }

    /// Splits `src` into `n` equally sized parts and caches them.
    ///
    /// Does nothing if `n` is one or `src` was already split. Panics if `n` is zero.
    #[track_caller]
    pub fn split_into(&mut self, src: Temp, n: usize) {
        assert!(n > 0, "can't split {src} into zero parts");

        if n == 1 || self.cache.get(src).is_some() {
            return;
        }

        assert!(n <= MAX_COMPONENTS, "can't split into {n} components");

        let rc = match src.ty() {
            RegType::Sgpr if n > usize::from(src.size()) => {
                return self.split_into(src, usize::from(src.size()));
            }

            RegType::Sgpr => {
                assert_eq!(usize::from(src.size()) % n, 0, "{src} can't be split into {n} parts");
                RegClass::new(RegType::Sgpr, src.size() / n as u8)
            }

            // per-lane parts are as wide as they need to be, down to single bytes
            RegType::Vgpr => {
                assert_eq!(usize::from(src.bytes()) % n, 0, "{src} can't be split into {n} parts");
                RegClass::get(RegType::Vgpr, src.bytes() / n as u8)
            }
        };

        let parts: SmallVec<[Temp; 4]> = (0..n).map(|_| self.tmp(rc)).collect();

        self.emit_at_def(
            src,
            Instruction::new(
                Opcode::PSplitVector,
                parts.iter().map(|&it| Definition::new(it)),
                [Operand::Temp(src)],
            ),
        );

        let cached = self.cache.insert(src, &parts);
        debug_assert!(cached);
    }

    /// Builds `dst` (with `n` components) out of the consecutive components of the per-lane
    /// `src`, placing them at the positions set in `mask`.
    ///
    /// Components not in `mask` are zero with `zero_fill`, and anything otherwise. An empty
    /// `mask` reads nothing from `src`.
    #[track_caller]
    pub fn expand(&mut self, src: Temp, dst: Temp, n: usize, mask: u32, zero_fill: bool) {
        assert_eq!(src.ty(), RegType::Vgpr, "expand reads per-lane values");
        assert!(n > 0 && n <= MAX_COMPONENTS);

        if dst.ty() == RegType::Sgpr && n > usize::from(dst.size()) {
            // packed scalar components have to be assembled per lane first
            let tmp = self.tmp(RegClass::get(RegType::Vgpr, dst.bytes()));
            self.expand(src, tmp, n, mask, zero_fill);
            self.as_uniform(dst, tmp);

            return;
        }

        if mask != 0 {
            self.split_into(src, mask.count_ones() as usize);
        }

        if src == dst {
            return;
        }

        if n == 1 && mask != 0 {
            match dst.ty() {
                RegType::Sgpr => self.as_uniform(dst, src),
                RegType::Vgpr => self.copy(dst, src),
            }

            return;
        }

        assert_eq!(usize::from(dst.bytes()) % n, 0, "{dst} can't hold {n} equal components");

        let component_bytes = dst.bytes() / n as u8;
        let src_rc = RegClass::get(RegType::Vgpr, component_bytes);
        let dst_rc = RegClass::get(dst.ty(), component_bytes);

        let padding = match zero_fill {
            true => {
                let zero = self.tmp(dst_rc);
                self.copy(zero, Constant::zero(component_bytes));
                Operand::Temp(zero)
            }

            false => Operand::Undef(dst_rc),
        };

        let mut operands: SmallVec<[Operand; 4]> = SmallVec::new();
        let mut next = 0;
        for component in 0..n {
            if mask & (1 << component) == 0 {
                operands.push(padding);
                continue;
            }

            let mut part = self.extract_component(src, next, src_rc);
            next += 1;

            if dst.ty() == RegType::Sgpr {
                let uniform = self.tmp(dst_rc);
                self.as_uniform(uniform, part);
                part = uniform;
            }

            operands.push(Operand::Temp(part));
        }

        self.emit(Instruction::new(
            Opcode::PCreateVector,
            [Definition::new(dst)],
            operands.iter().copied(),
        ));

        let parts: Option<SmallVec<[Temp; 4]>> = operands.iter().map(Operand::temp).collect();
        if let Some(parts) = parts {
            self.cache.insert(dst, &parts);
        }
    }

    /// A new value of class `rc` made of `parts` in order.
    pub fn create_vector(&mut self, parts: &[Temp], rc: RegClass) -> Temp {
        let dst = self.tmp(rc);
        self.create_vector_into(dst, parts);

        dst
    }

    #[track_caller]
    pub(crate) fn create_vector_into(&mut self, dst: Temp, parts: &[Temp]) {
        let bytes: u32 = parts.iter().map(|it| u32::from(it.bytes())).sum();
        assert_eq!(bytes, u32::from(dst.bytes()), "parts don't add up to {dst}:{}", dst.rc());

        self.emit(Instruction::new(
            Opcode::PCreateVector,
            [Definition::new(dst)],
            parts.iter().map(|&it| Operand::Temp(it)),
        ));

        self.cache.insert(dst, parts);
    }

    /// The integer held in the low `src_bits` of `src`, zero- or sign-extended or truncated to
    /// `dst_bits`.
    #[track_caller]
    pub fn convert_width(&mut self, src: Temp, src_bits: u8, dst_bits: u8, sign_extend: bool) -> Temp {
        self.convert_width_into(src, src_bits, dst_bits, sign_extend, None)
    }

    #[track_caller]
    pub(crate) fn convert_width_into(
        &mut self,
        src: Temp,
        src_bits: u8,
        dst_bits: u8,
        sign_extend: bool,
        dst: Option<Temp>,
    ) -> Temp {
        assert!(
            !(sign_extend && dst_bits < src_bits),
            "shrinking integers is not supported for signed inputs"
        );

        let dst = dst.unwrap_or_else(|| {
            let rc = match dst_bits % 32 == 0 || src.ty() == RegType::Sgpr {
                true => RegClass::new(src.ty(), dst_bits.div_ceil(32)),
                false => RegClass::subdword(dst_bits / 8),
            };

            self.tmp(rc)
        });

        assert!(src.ty() == RegType::Sgpr || u32::from(src_bits) == u32::from(src.bytes()) * 8);
        assert!(dst.ty() == RegType::Sgpr || u32::from(dst_bits) == u32::from(dst.bytes()) * 8);

        if src_bits == dst_bits || (dst.bytes() == src.bytes() && dst_bits < src_bits) {
            // the bits above dst_bits in the scalar case are allowed to be anything
            match (src.ty(), dst.ty()) {
                (RegType::Vgpr, RegType::Sgpr) => self.as_uniform(dst, src),
                _ => self.copy(dst, src),
            }

            return dst;
        }

        if dst.bytes() < src.bytes() {
            self.emit(Instruction::new(
                Opcode::PExtractVector,
                [Definition::new(dst)],
                [Operand::Temp(src), Operand::Const(Constant::zero(4))],
            ));

            return dst;
        }

        let low = match dst_bits {
            64 if src_bits == 32 => src,
            64 => self.tmp(RegClass::new(src.ty(), 1)),
            _ => dst,
        };

        if low != src {
            assert!(src_bits < 32);

            let operands = [
                Operand::Temp(src),
                Operand::Const(Constant::zero(4)),
                Operand::Const(Constant::c32(u32::from(src_bits))),
                Operand::Const(Constant::c32(u32::from(sign_extend))),
            ];

            match src.rc() == RegClass::S1 {
                true => {
                    let scc = self.tmp(RegClass::S1);
                    self.emit(Instruction::new(
                        Opcode::PExtract,
                        [Definition::new(low), Definition::fixed(scc, FixedReg::Scc)],
                        operands,
                    ));
                }

                false => {
                    self.emit(Instruction::new(Opcode::PExtract, [Definition::new(low)], operands));
                }
            }
        }

        if dst_bits == 64 {
            let high = match (sign_extend, dst.ty()) {
                (true, RegType::Sgpr) => {
                    let high = self.tmp(RegClass::S1);
                    let scc = self.tmp(RegClass::S1);
                    self.emit(Instruction::new(
                        Opcode::SAshrI32,
                        [Definition::new(high), Definition::fixed(scc, FixedReg::Scc)],
                        [Operand::Temp(low), Operand::Const(Constant::c32(31))],
                    ));

                    Operand::Temp(high)
                }

                (true, RegType::Vgpr) => {
                    let high = self.tmp(RegClass::V1);
                    self.emit(Instruction::new(
                        Opcode::VAshrrevI32,
                        [Definition::new(high)],
                        [Operand::Const(Constant::c32(31)), Operand::Temp(low)],
                    ));

                    Operand::Temp(high)
                }

                (false, _) => Operand::Const(Constant::zero(4)),
            };

            self.emit(Instruction::new(
                Opcode::PCreateVector,
                [Definition::new(dst)],
                [Operand::Temp(low), high],
            ));
        }

        dst
    }
}

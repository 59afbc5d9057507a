use wavesel_core::{Opcode, RegClass};

use super::{EvalError, Lane};
use crate::{Constant, Definition, Instruction, Operand, Options, Program};

#[test]
fn split_and_create() {
    let mut program = Program::new(&Options::default());
    let src = program.allocate_tmp(RegClass::V2);
    let (lo, hi) = (program.allocate_tmp(RegClass::V1), program.allocate_tmp(RegClass::V1));
    let swapped = program.allocate_tmp(RegClass::V2);

    let mut lane = Lane::new();
    lane.set(src, &[1, 2, 3, 4, 5, 6, 7, 8]);

    lane.run(&[
        Instruction::new(Opcode::PSplitVector, [Definition::new(lo), Definition::new(hi)], [Operand::Temp(src)]),
        Instruction::new(Opcode::PCreateVector, [Definition::new(swapped)], [Operand::Temp(hi), Operand::Temp(lo)]),
    ])
    .unwrap();

    assert_eq!(lane.get(swapped), Some(&[5, 6, 7, 8, 1, 2, 3, 4][..]));
}

#[test]
fn sign_extending_extract() {
    let mut program = Program::new(&Options::default());
    let src = program.allocate_tmp(RegClass::S1);
    let dst = program.allocate_tmp(RegClass::S1);

    let mut lane = Lane::new();
    lane.set(src, &[0x34, 0x80, 0, 0]);

    let extract = |sign: u32| {
        Instruction::new(
            Opcode::PExtract,
            [Definition::new(dst)],
            [
                Operand::Temp(src),
                Operand::Const(Constant::c32(1)),
                Operand::Const(Constant::c32(8)),
                Operand::Const(Constant::c32(sign)),
            ],
        )
    };

    lane.step(&extract(1)).unwrap();
    assert_eq!(lane.get(dst), Some(&[0x80, 0xff, 0xff, 0xff][..]));

    lane.step(&extract(0)).unwrap();
    assert_eq!(lane.get(dst), Some(&[0x80, 0, 0, 0][..]));
}

#[test]
fn errors() {
    let mut program = Program::new(&Options::default());
    let src = program.allocate_tmp(RegClass::V1);
    let dst = program.allocate_tmp(RegClass::V2);

    let mut lane = Lane::new();
    let copy = Instruction::new(Opcode::PParallelcopy, [Definition::new(dst)], [Operand::Temp(src)]);
    assert_eq!(lane.step(&copy), Err(EvalError::UnknownValue(src.id())));

    lane.set(src, &[0; 4]);
    let create = Instruction::new(Opcode::PCreateVector, [Definition::new(dst)], [Operand::Temp(src)]);
    assert!(matches!(lane.step(&create), Err(EvalError::SizeMismatch(_))));

    assert_eq!(
        lane.step(&Instruction::bare(Opcode::SEndpgm)),
        Err(EvalError::Unsupported(Opcode::SEndpgm))
    );
}

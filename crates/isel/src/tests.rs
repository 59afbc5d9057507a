use expect_test::Expect;
use wavesel_ir::Shader;

use crate::{IselError, Options, Program, select_program};

mod random;

/// Routes `tracing` output into the test harness. Only the first call in a process installs it.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[track_caller]
pub(crate) fn assemble(input: &str) -> Shader {
    let output = wavesel_asm::parse(input);
    for error in &output.errors {
        eprintln!("error: {error}");
    }

    match output.shader {
        Some(shader) => shader,
        None => panic!("failing due to previous error(s)"),
    }
}

#[track_caller]
pub(crate) fn select(input: &str) -> Result<Program, IselError> {
    init_tracing();
    select_program(&assemble(input), &Options::default())
}

#[track_caller]
pub(crate) fn expect_program(input: &str, expect: Expect) {
    let program = match select(input) {
        Ok(program) => program,
        Err(e) => panic!("{e}"),
    };

    crate::validate::assert_well_formed(&program);
    expect.assert_eq(&program.display().to_string());
}

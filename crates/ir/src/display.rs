use std::fmt;

use wavesel_core::BranchHint;

use crate::{CfNode, Shader};

/// Pretty printer for a [`Shader`], producing the same syntax `wavesel-asm` reads.
pub struct ShaderDisplay<'a>(pub(crate) &'a Shader);

fn indent(f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("    ")?;
    }

    Ok(())
}

fn nodes(f: &mut fmt::Formatter, body: &[CfNode], depth: usize) -> fmt::Result {
    for node in body {
        match node {
            CfNode::Block(instrs) => {
                for instr in instrs {
                    indent(f, depth)?;
                    writeln!(f, "{instr}")?;
                }
            }

            CfNode::If(it) => {
                indent(f, depth)?;
                write!(f, "if {}", it.cond)?;
                if it.hint != BranchHint::None {
                    write!(f, " {}", it.hint)?;
                }
                f.write_str(" {\n")?;

                nodes(f, &it.then_body, depth + 1)?;

                if !it.else_body.is_empty() {
                    indent(f, depth)?;
                    f.write_str("} else {\n")?;
                    nodes(f, &it.else_body, depth + 1)?;
                }

                indent(f, depth)?;
                f.write_str("}\n")?;
            }

            CfNode::Loop(it) => {
                indent(f, depth)?;
                match it.divergent_break {
                    true => f.write_str("loop divergent_break {\n")?,
                    false => f.write_str("loop {\n")?,
                }

                nodes(f, &it.body, depth + 1)?;

                indent(f, depth)?;
                f.write_str("}\n")?;
            }
        }
    }

    Ok(())
}

impl fmt::Display for ShaderDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shader = self.0;

        if let Some(gfx) = shader.gfx {
            writeln!(f, ".gfx {gfx}")?;
        }

        if let Some(wave) = shader.wave {
            writeln!(f, ".wave {}", wave.lanes())?;
        }

        if let Some(stage) = shader.stage {
            writeln!(f, ".stage {stage}")?;
        }

        nodes(f, &shader.body, 0)
    }
}

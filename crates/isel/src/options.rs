use wavesel_core::{GfxLevel, Stage, WaveSize};
use wavesel_ir::Shader;

use crate::IselError;

/// Descriptive input to selection. Nothing in here changes while a program is being built.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Options {
    pub gfx_level: GfxLevel,
    pub wave_size: WaveSize,
    pub stage: Stage,
    /// Deepest `if`/`loop` nesting the driver accepts.
    pub max_cf_depth: usize,
    /// Any wide-execution request keeps helper lanes alive.
    pub require_full_quads: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            gfx_level: GfxLevel::Gfx10,
            wave_size: WaveSize::W64,
            stage: Stage::Compute,
            max_cf_depth: 64,
            require_full_quads: false,
        }
    }
}

impl Options {
    /// `self` with the overrides the shader carries.
    #[must_use]
    pub fn for_shader(&self, shader: &Shader) -> Self {
        Self {
            gfx_level: shader.gfx.unwrap_or(self.gfx_level),
            wave_size: shader.wave.unwrap_or(self.wave_size),
            stage: shader.stage.unwrap_or(self.stage),
            ..self.clone()
        }
    }

    pub fn check(&self) -> Result<(), IselError> {
        match self.gfx_level.supports(self.wave_size) {
            true => Ok(()),
            false => Err(IselError::Unsupported {
                loc: None,
                instr: None,
                reason: format!(
                    "{} doesn't support {}-lane waves",
                    self.gfx_level,
                    self.wave_size.lanes()
                ),
            }),
        }
    }
}

//! Whole-quad mode: which instructions need their quad neighbours to keep computing.
//!
//! Deciding that is hardware tuning as much as correctness, so it's a policy the driver
//! consults rather than something baked into the lowering.

use wavesel_core::Stage;
use wavesel_ir::{Instr, Op};

use crate::{CfContext, Context, WqmPoint};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum WqmRequest {
    /// Neighbouring lanes of the active ones must run.
    Wqm,
    /// Like [`Self::Wqm`], and lanes that were discarded or demoted have to keep running too.
    WqmWithHelpers,
}

pub trait WqmPolicy {
    /// Whether `instr`, lowered at a point described by `cf`, needs whole-quad execution.
    fn request(&self, instr: &Instr, cf: &CfContext, stage: Stage) -> Option<WqmRequest>;
}

/// Fragment shaders need whole quads for derivatives, either explicit or implied by texture
/// sampling.
#[derive(Debug, Default, Copy, Clone)]
pub struct FragmentWqmPolicy;

impl WqmPolicy for FragmentWqmPolicy {
    fn request(&self, instr: &Instr, _cf: &CfContext, stage: Stage) -> Option<WqmRequest> {
        if stage != Stage::Fragment {
            return None;
        }

        match &instr.op {
            Op::Derivative { .. } | Op::Tex { implicit_derivatives: true, .. } => {
                Some(WqmRequest::WqmWithHelpers)
            }

            Op::ReadFirstLane(_) => Some(WqmRequest::Wqm),

            _ => None,
        }
    }
}

/// Never asks for whole-quad mode.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoWqm;

impl WqmPolicy for NoWqm {
    fn request(&self, _instr: &Instr, _cf: &CfContext, _stage: Stage) -> Option<WqmRequest> {
        None
    }
}

impl Context {
    /// Records that whole-quad execution is needed up to the end of the current block.
    ///
    /// Only fragment shaders have quads to speak of; elsewhere this does nothing.
    pub fn request_wqm(&mut self, request: WqmRequest) {
        if self.program.stage != Stage::Fragment {
            return;
        }

        let block = self.block;
        let instruction = self.program.block(block).instructions.len();
        self.program.wqm_point = Some(WqmPoint { block, instruction });

        self.program.needs_wqm |=
            request == WqmRequest::WqmWithHelpers || self.options.require_full_quads;

        tracing::trace!(%block, instruction, ?request, "wqm requested");
    }
}

#[cfg(test)]
mod tests {
    use wavesel_core::Stage;
    use wavesel_ir::{Axis, DefId, Instr, Op};

    use super::{FragmentWqmPolicy, WqmPolicy, WqmRequest};
    use crate::{CfContext, Context, Options};

    #[test]
    fn fragment_only() {
        let ddx = Instr::new(None, Op::Derivative { src: DefId(0), axis: Axis::X });
        let cf = CfContext::default();

        assert_eq!(
            FragmentWqmPolicy.request(&ddx, &cf, Stage::Fragment),
            Some(WqmRequest::WqmWithHelpers)
        );
        assert_eq!(FragmentWqmPolicy.request(&ddx, &cf, Stage::Compute), None);

        let tex = Instr::new(None, Op::Tex { coords: vec![DefId(0)], implicit_derivatives: false });
        assert_eq!(FragmentWqmPolicy.request(&tex, &cf, Stage::Fragment), None);
    }

    #[test]
    fn helpers_set_needs_wqm() {
        let options = Options { stage: Stage::Fragment, ..Options::default() };

        let mut ctx = Context::new(&options);
        ctx.request_wqm(WqmRequest::Wqm);
        assert!(!ctx.program().needs_wqm);
        assert_eq!(ctx.program().wqm_point.map(|it| it.instruction), Some(1));

        ctx.request_wqm(WqmRequest::WqmWithHelpers);
        assert!(ctx.program().needs_wqm);

        let options = Options { require_full_quads: true, ..options };
        let mut ctx = Context::new(&options);
        ctx.request_wqm(WqmRequest::Wqm);
        assert!(ctx.program().needs_wqm);

        let mut ctx = Context::new(&Options::default());
        ctx.request_wqm(WqmRequest::WqmWithHelpers);
        assert!(!ctx.program().needs_wqm);
        assert_eq!(ctx.program().wqm_point, None);
    }
}
